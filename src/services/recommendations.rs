use std::collections::HashSet;
use std::sync::Arc;

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::{
    db::BookStore,
    error::AppResult,
    models::{HistoryEntry, RecommendedBook, UNKNOWN_GENRE},
    services::catalog::BookSource,
};

/// Topics used when there is nothing to personalize from
pub const FALLBACK_TOPICS: &[&str] = &[
    "fiction",
    "fantasy",
    "science fiction",
    "mystery",
    "thriller",
    "romance",
    "historical fiction",
    "biography",
    "history",
    "philosophy",
    "poetry",
    "classics",
];

/// How many of the user's genres seed the candidate searches
const TOP_GENRE_COUNT: usize = 2;

/// Genres in the user's history, most frequent first
///
/// "Unknown" and blank genres are ignored. Equal counts keep the order in which
/// the genre first appears in `history`.
pub fn top_genres(history: &[HistoryEntry], limit: usize) -> Vec<String> {
    let mut tally: Vec<(String, usize)> = Vec::new();

    for entry in history {
        let genre = entry.genre.trim();
        if genre.is_empty() || genre.eq_ignore_ascii_case(UNKNOWN_GENRE) {
            continue;
        }
        match tally.iter_mut().find(|(g, _)| g == genre) {
            Some((_, count)) => *count += 1,
            None => tally.push((genre.to_string(), 1)),
        }
    }

    // Stable sort keeps first-encountered order among ties
    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally.into_iter().take(limit).map(|(g, _)| g).collect()
}

fn subject_query(topic: &str) -> String {
    format!("subject:{}", topic)
}

/// Generates personalized reading recommendations
///
/// Genres are tallied from the user's read and reading shelves, the top two are
/// searched in the catalog, and anything the user has already engaged with is
/// dropped. The pool is shuffled and cut to size; a short pool is topped up
/// from a random topic. No failure escapes: the caller always gets a list.
#[derive(Clone)]
pub struct Recommender {
    store: Arc<dyn BookStore>,
    source: Arc<dyn BookSource>,
    count: usize,
}

impl Recommender {
    pub fn new(store: Arc<dyn BookStore>, source: Arc<dyn BookSource>, count: usize) -> Self {
        Self {
            store,
            source,
            count,
        }
    }

    pub async fn recommend(&self, user_id: Option<&str>) -> Vec<RecommendedBook> {
        let mut rng = StdRng::from_entropy();
        self.recommend_with_rng(user_id, &mut rng).await
    }

    pub async fn recommend_with_rng<R: Rng + Send>(
        &self,
        user_id: Option<&str>,
        rng: &mut R,
    ) -> Vec<RecommendedBook> {
        let Some(user_id) = user_id else {
            tracing::debug!("No user, serving random recommendations");
            return self.random_fallback(rng, &[], &HashSet::new()).await;
        };

        match self.personalized(user_id, rng).await {
            Ok(Some(recommendations)) => {
                tracing::info!(
                    user_id = %user_id,
                    count = recommendations.len(),
                    "Personalized recommendations generated"
                );
                recommendations
            }
            Ok(None) => {
                tracing::debug!(user_id = %user_id, "No usable history, serving random recommendations");
                self.random_fallback(rng, &[], &HashSet::new()).await
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Personalized recommendations failed, serving random recommendations"
                );
                self.random_fallback(rng, &[], &HashSet::new()).await
            }
        }
    }

    /// `Ok(None)` when the user has no history with a usable genre
    async fn personalized<R: Rng + Send>(
        &self,
        user_id: &str,
        rng: &mut R,
    ) -> AppResult<Option<Vec<RecommendedBook>>> {
        let history: Vec<HistoryEntry> = self
            .store
            .user_history(user_id)
            .await?
            .into_iter()
            .filter(|entry| entry.status.is_engaged())
            .collect();

        if history.is_empty() {
            return Ok(None);
        }

        let genres = top_genres(&history, TOP_GENRE_COUNT);
        if genres.is_empty() {
            return Ok(None);
        }

        let seen: HashSet<String> = history.into_iter().map(|entry| entry.external_id).collect();

        let mut pool = Vec::new();
        for genre in &genres {
            let results = self.source.search(&subject_query(genre)).await?;
            pool.extend(results.into_iter().filter(|book| !seen.contains(&book.id)));
        }

        tracing::debug!(
            user_id = %user_id,
            genres = ?genres,
            candidates = pool.len(),
            "Recommendation pool built"
        );

        pool.shuffle(rng);

        let mut keys = HashSet::new();
        let mut picked: Vec<RecommendedBook> = pool
            .iter()
            .map(RecommendedBook::from)
            .filter(|rec| keys.insert((rec.title.to_lowercase(), rec.author.to_lowercase())))
            .take(self.count)
            .collect();

        if picked.len() < self.count {
            let mut excluded = seen;
            excluded.extend(picked.iter().map(|rec| rec.external_id.clone()));

            let backfill = self.random_fallback(rng, &genres, &excluded).await;
            let missing = self.count - picked.len();
            picked.extend(backfill.into_iter().take(missing));
        }

        Ok(Some(picked))
    }

    /// First results of a random topic, skipping `excluded` ids.
    /// Topics in `avoid_topics` are not drawn while any other topic remains.
    async fn random_fallback<R: Rng + Send>(
        &self,
        rng: &mut R,
        avoid_topics: &[String],
        excluded: &HashSet<String>,
    ) -> Vec<RecommendedBook> {
        let topic = random_topic(rng, avoid_topics);

        match self.source.search(&subject_query(topic)).await {
            Ok(books) => books
                .iter()
                .filter(|book| !excluded.contains(&book.id))
                .take(self.count)
                .map(RecommendedBook::from)
                .collect(),
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Random recommendations unavailable");
                Vec::new()
            }
        }
    }
}

/// Uniform draw from `FALLBACK_TOPICS`, excluding `avoid` where possible
pub fn random_topic<R: Rng + ?Sized>(rng: &mut R, avoid: &[String]) -> &'static str {
    let candidates: Vec<&'static str> = FALLBACK_TOPICS
        .iter()
        .copied()
        .filter(|topic| !avoid.iter().any(|a| a.eq_ignore_ascii_case(topic)))
        .collect();

    let pool: &[&'static str] = if candidates.is_empty() {
        FALLBACK_TOPICS
    } else {
        &candidates
    };

    pool.choose(rng).copied().unwrap_or("fiction")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        error::AppError,
        models::{Book, NewBook, ShelfStatus},
        services::catalog::MockBookSource,
    };

    fn book(id: &str, title: &str, author: &str) -> Book {
        Book {
            id: id.to_string(),
            title: title.to_string(),
            authors: vec![author.to_string()],
            description: String::new(),
            published_date: String::new(),
            categories: vec![],
            cover_url: None,
        }
    }

    fn books(prefix: &str, n: usize) -> Vec<Book> {
        (0..n)
            .map(|i| book(&format!("{}{}", prefix, i), &format!("{} title {}", prefix, i), "Author"))
            .collect()
    }

    fn history(genres: &[&str]) -> Vec<HistoryEntry> {
        genres
            .iter()
            .enumerate()
            .map(|(i, g)| HistoryEntry {
                external_id: format!("h{}", i),
                genre: g.to_string(),
                status: ShelfStatus::Read,
            })
            .collect()
    }

    async fn shelve(store: &MemoryStore, user: &str, id: &str, genre: &str, status: ShelfStatus) {
        let stored = store
            .upsert_book(&NewBook {
                external_id: id.to_string(),
                title: id.to_string(),
                author: "Author".to_string(),
                cover_url: None,
                genre: genre.to_string(),
            })
            .await
            .unwrap();
        store
            .upsert_shelf_status(user, stored.id, status)
            .await
            .unwrap();
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_top_genres_by_count() {
        let h = history(&["Fantasy", "Mystery", "Mystery", "Horror", "Mystery", "Fantasy"]);
        assert_eq!(top_genres(&h, 2), vec!["Mystery", "Fantasy"]);
    }

    #[test]
    fn test_top_genres_ties_keep_first_seen() {
        let h = history(&["Horror", "Fantasy", "Fantasy", "Horror", "Poetry"]);
        assert_eq!(top_genres(&h, 2), vec!["Horror", "Fantasy"]);
    }

    #[test]
    fn test_top_genres_ignores_unknown() {
        let h = history(&["Unknown", "Unknown", "", "Poetry"]);
        assert_eq!(top_genres(&h, 2), vec!["Poetry"]);
        assert!(top_genres(&history(&["Unknown"]), 2).is_empty());
    }

    #[test]
    fn test_random_topic_avoids_given_topics() {
        let avoid: Vec<String> = FALLBACK_TOPICS
            .iter()
            .filter(|t| **t != "poetry")
            .map(|t| t.to_uppercase())
            .collect();
        let mut rng = rng();
        for _ in 0..10 {
            assert_eq!(random_topic(&mut rng, &avoid), "poetry");
        }
    }

    #[tokio::test]
    async fn test_anonymous_user_gets_random_fallback() {
        let mut source = MockBookSource::new();
        source
            .expect_search()
            .withf(|q| q.starts_with("subject:"))
            .times(1)
            .returning(|_| Ok(books("r", 10)));

        let recommender = Recommender::new(Arc::new(MemoryStore::new()), Arc::new(source), 5);
        let recs = recommender.recommend_with_rng(None, &mut rng()).await;

        assert_eq!(recs.len(), 5);
        // Fallback keeps the source's order
        assert_eq!(recs[0].external_id, "r0");
        assert!(recs.iter().all(|r| !r.title.is_empty() && !r.author.is_empty()));
    }

    #[tokio::test]
    async fn test_empty_history_gets_random_fallback() {
        let store = MemoryStore::new();
        shelve(&store, "u1", "wish", "Fantasy", ShelfStatus::WantToRead).await;

        let mut source = MockBookSource::new();
        source
            .expect_search()
            .times(1)
            .returning(|_| Ok(books("r", 10)));

        let recommender = Recommender::new(Arc::new(store), Arc::new(source), 5);
        let recs = recommender.recommend_with_rng(Some("u1"), &mut rng()).await;
        assert_eq!(recs.len(), 5);
    }

    #[tokio::test]
    async fn test_personalized_excludes_history() {
        let store = MemoryStore::new();
        for i in 0..10 {
            shelve(&store, "u1", &format!("seen{}", i), "Fantasy", ShelfStatus::Read).await;
        }

        let mut source = MockBookSource::new();
        source
            .expect_search()
            .withf(|q| q == "subject:Fantasy")
            .returning(|_| {
                let mut results: Vec<Book> = (0..10)
                    .map(|i| book(&format!("seen{}", i), &format!("Seen {}", i), "Author"))
                    .collect();
                results.extend(books("new", 8));
                Ok(results)
            });

        let recommender = Recommender::new(Arc::new(store), Arc::new(source), 5);
        let recs = recommender.recommend_with_rng(Some("u1"), &mut rng()).await;

        assert_eq!(recs.len(), 5);
        assert!(recs.iter().all(|r| r.external_id.starts_with("new")));
    }

    #[tokio::test]
    async fn test_personalized_dedups_by_title_and_author() {
        let store = MemoryStore::new();
        shelve(&store, "u1", "seen", "Mystery", ShelfStatus::Reading).await;

        let mut source = MockBookSource::new();
        source.expect_search().returning(|q| {
            if q == "subject:Mystery" {
                Ok(vec![
                    book("a", "The Big Sleep", "Raymond Chandler"),
                    book("b", "THE BIG SLEEP", "raymond chandler"),
                    book("c", "Gaudy Night", "Dorothy L. Sayers"),
                ])
            } else {
                Ok(vec![])
            }
        });

        let recommender = Recommender::new(Arc::new(store), Arc::new(source), 5);
        let recs = recommender.recommend_with_rng(Some("u1"), &mut rng()).await;

        let sleep_count = recs
            .iter()
            .filter(|r| r.title.eq_ignore_ascii_case("the big sleep"))
            .count();
        assert_eq!(sleep_count, 1);
        assert_eq!(recs.len(), 2);
    }

    #[tokio::test]
    async fn test_short_pool_is_backfilled_without_seen_books() {
        let store = MemoryStore::new();
        shelve(&store, "u1", "seen", "Poetry", ShelfStatus::Read).await;

        let mut source = MockBookSource::new();
        source.expect_search().returning(|q| {
            if q == "subject:Poetry" {
                Ok(vec![book("p1", "Ariel", "Sylvia Plath")])
            } else {
                let mut results = vec![book("seen", "Seen", "Author"), book("p1", "Ariel", "Sylvia Plath")];
                results.extend(books("fill", 10));
                Ok(results)
            }
        });

        let recommender = Recommender::new(Arc::new(store), Arc::new(source), 5);
        let recs = recommender.recommend_with_rng(Some("u1"), &mut rng()).await;

        let ids: Vec<&str> = recs.iter().map(|r| r.external_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "fill0", "fill1", "fill2", "fill3"]);
    }

    #[tokio::test]
    async fn test_search_failure_falls_back_to_random() {
        let store = MemoryStore::new();
        shelve(&store, "u1", "seen", "Horror", ShelfStatus::Read).await;

        let mut source = MockBookSource::new();
        source.expect_search().returning(|q| {
            if q == "subject:Horror" {
                Err(AppError::ExternalApi("down".to_string()))
            } else {
                Ok(books("r", 6))
            }
        });

        let recommender = Recommender::new(Arc::new(store), Arc::new(source), 5);
        let recs = recommender.recommend_with_rng(Some("u1"), &mut rng()).await;
        assert_eq!(recs.len(), 5);
        assert!(recs.iter().all(|r| r.external_id.starts_with('r')));
    }

    #[tokio::test]
    async fn test_total_failure_yields_empty_list() {
        let mut source = MockBookSource::new();
        source
            .expect_search()
            .returning(|_| Err(AppError::ExternalApi("down".to_string())));

        let recommender = Recommender::new(Arc::new(MemoryStore::new()), Arc::new(source), 5);
        assert!(recommender.recommend_with_rng(None, &mut rng()).await.is_empty());
        assert!(recommender
            .recommend_with_rng(Some("u1"), &mut rng())
            .await
            .is_empty());
    }
}
