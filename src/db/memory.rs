use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::BookStore,
    error::AppResult,
    models::{
        HistoryEntry, NewBook, Quote, RatingSummary, Review, ReviewWithUser, ShelfCounts,
        ShelfStatus, StoredBook, UserProfile, UNKNOWN_AUTHOR, UNKNOWN_GENRE,
    },
};

struct ShelfEntry {
    status: ShelfStatus,
    /// Monotonic write counter, stands in for `updated_at`
    seq: u64,
}

#[derive(Default)]
struct MemoryStoreInner {
    users: HashMap<String, UserProfile>,
    /// Keyed by external id
    books: HashMap<String, StoredBook>,
    shelves: HashMap<(String, Uuid), ShelfEntry>,
    ratings: HashMap<(String, Uuid), i32>,
    reviews: Vec<Review>,
    quotes: Vec<Quote>,
    seq: u64,
}

impl MemoryStoreInner {
    fn book_by_id(&self, id: Uuid) -> Option<&StoredBook> {
        self.books.values().find(|b| b.id == id)
    }
}

/// In-process `BookStore` for tests and local runs
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BookStore for MemoryStore {
    async fn upsert_user(&self, user: &UserProfile) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn upsert_book(&self, book: &NewBook) -> AppResult<StoredBook> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .books
            .entry(book.external_id.clone())
            .and_modify(|existing| {
                existing.title = book.title.clone();
                if book.author != UNKNOWN_AUTHOR {
                    existing.author = book.author.clone();
                }
                if book.cover_url.is_some() {
                    existing.cover_url = book.cover_url.clone();
                }
                if book.genre != UNKNOWN_GENRE {
                    existing.genre = book.genre.clone();
                }
            })
            .or_insert_with(|| StoredBook {
                id: Uuid::new_v4(),
                external_id: book.external_id.clone(),
                title: book.title.clone(),
                author: book.author.clone(),
                cover_url: book.cover_url.clone(),
                genre: book.genre.clone(),
            });
        Ok(stored.clone())
    }

    async fn find_book(&self, external_id: &str) -> AppResult<Option<StoredBook>> {
        let inner = self.inner.read().await;
        Ok(inner.books.get(external_id).cloned())
    }

    async fn upsert_shelf_status(
        &self,
        user_id: &str,
        book_id: Uuid,
        status: ShelfStatus,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.seq += 1;
        let seq = inner.seq;
        inner
            .shelves
            .insert((user_id.to_string(), book_id), ShelfEntry { status, seq });
        Ok(())
    }

    async fn shelf_status(&self, user_id: &str, book_id: Uuid) -> AppResult<Option<ShelfStatus>> {
        let inner = self.inner.read().await;
        Ok(inner
            .shelves
            .get(&(user_id.to_string(), book_id))
            .map(|entry| entry.status))
    }

    async fn user_history(&self, user_id: &str) -> AppResult<Vec<HistoryEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<(u64, HistoryEntry)> = inner
            .shelves
            .iter()
            .filter(|((owner, _), entry)| owner == user_id && entry.status.is_engaged())
            .filter_map(|((_, book_id), entry)| {
                inner.book_by_id(*book_id).map(|book| {
                    (
                        entry.seq,
                        HistoryEntry {
                            external_id: book.external_id.clone(),
                            genre: book.genre.clone(),
                            status: entry.status,
                        },
                    )
                })
            })
            .collect();

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries.into_iter().map(|(_, entry)| entry).collect())
    }

    async fn shelf_counts(&self, user_id: &str) -> AppResult<ShelfCounts> {
        let inner = self.inner.read().await;
        let mut counts = ShelfCounts::default();
        for ((owner, _), entry) in inner.shelves.iter() {
            if owner == user_id {
                counts.add(entry.status, 1);
            }
        }
        Ok(counts)
    }

    async fn upsert_rating(&self, user_id: &str, book_id: Uuid, value: i32) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.ratings.insert((user_id.to_string(), book_id), value);
        Ok(())
    }

    async fn rating_summary(&self, book_id: Uuid) -> AppResult<RatingSummary> {
        let inner = self.inner.read().await;
        let values: Vec<i32> = inner
            .ratings
            .iter()
            .filter(|((_, id), _)| *id == book_id)
            .map(|(_, value)| *value)
            .collect();
        Ok(RatingSummary::from_values(&values))
    }

    async fn ratings_by_user(&self, user_id: &str) -> AppResult<Vec<i32>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ratings
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, value)| *value)
            .collect())
    }

    async fn create_review(
        &self,
        user_id: &str,
        book_id: Uuid,
        content: &str,
        rating: i32,
    ) -> AppResult<Review> {
        let review = Review {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            book_id,
            content: content.to_string(),
            rating,
            created_at: Utc::now(),
        };
        let mut inner = self.inner.write().await;
        inner.reviews.push(review.clone());
        Ok(review)
    }

    async fn reviews_for_book(&self, book_id: Uuid) -> AppResult<Vec<ReviewWithUser>> {
        let inner = self.inner.read().await;
        // Newest first: reviews are appended in creation order
        Ok(inner
            .reviews
            .iter()
            .rev()
            .filter(|r| r.book_id == book_id)
            .map(|r| ReviewWithUser {
                review: r.clone(),
                user: inner
                    .users
                    .get(&r.user_id)
                    .cloned()
                    .unwrap_or_else(|| UserProfile::anonymous(&r.user_id)),
            })
            .collect())
    }

    async fn add_quote(
        &self,
        user_id: &str,
        book_id: Uuid,
        content: &str,
        page: Option<i32>,
    ) -> AppResult<Quote> {
        let quote = Quote {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            book_id,
            content: content.to_string(),
            page,
            created_at: Utc::now(),
        };
        let mut inner = self.inner.write().await;
        inner.quotes.push(quote.clone());
        Ok(quote)
    }

    async fn quotes_for_user(&self, user_id: &str, book_id: Option<Uuid>) -> AppResult<Vec<Quote>> {
        let inner = self.inner.read().await;
        Ok(inner
            .quotes
            .iter()
            .rev()
            .filter(|q| q.user_id == user_id && book_id.map_or(true, |id| q.book_id == id))
            .cloned()
            .collect())
    }

    async fn delete_quote(&self, user_id: &str, quote_id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.quotes.len();
        inner
            .quotes
            .retain(|q| !(q.id == quote_id && q.user_id == user_id));
        Ok(inner.quotes.len() < before)
    }
}
