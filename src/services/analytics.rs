use std::sync::Arc;

use serde::Serialize;

use crate::{
    db::BookStore,
    error::AppResult,
    models::{RatingSummary, ShelfCounts},
    services::{
        generative::{ChatTurn, GenerativeClient},
        recommendations::top_genres,
    },
};

const GENRE_LIMIT: usize = 5;

const INSIGHT_INSTRUCTION: &str = "You are a friendly reading coach. Given a reader's statistics, \
write one short paragraph (at most four sentences) describing their reading habits and \
suggesting one direction to explore next. Do not use lists or headings.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

/// Reading statistics for one user
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingAnalytics {
    pub shelves: ShelfCounts,
    pub top_genres: Vec<GenreCount>,
    pub ratings_given: i64,
    pub average_rating: Option<f64>,
    /// Generated summary; absent when generation is unavailable or fails
    pub insight: Option<String>,
}

impl ReadingAnalytics {
    /// Plain-text summary fed to the generative provider
    pub fn describe(&self) -> String {
        let genres = if self.top_genres.is_empty() {
            "none recorded".to_string()
        } else {
            self.top_genres
                .iter()
                .map(|g| format!("{} ({})", g.genre, g.count))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let average = self
            .average_rating
            .map(|avg| format!("{:.1} out of 5", avg))
            .unwrap_or_else(|| "no ratings yet".to_string());

        format!(
            "Books read: {}. Currently reading: {}. Want to read: {}. \
             Favourite genres: {}. Ratings given: {}, average {}.",
            self.shelves.read,
            self.shelves.reading,
            self.shelves.want_to_read,
            genres,
            self.ratings_given,
            average
        )
    }
}

/// Computes shelf, genre and rating statistics, plus an optional generated insight
pub async fn reading_analytics(
    store: &dyn BookStore,
    generative: Option<&Arc<dyn GenerativeClient>>,
    user_id: &str,
) -> AppResult<ReadingAnalytics> {
    let shelves = store.shelf_counts(user_id).await?;
    let history = store.user_history(user_id).await?;
    let ratings = store.ratings_by_user(user_id).await?;

    let genres = top_genres(&history, GENRE_LIMIT)
        .into_iter()
        .map(|genre| {
            let count = history.iter().filter(|h| h.genre.trim() == genre).count();
            GenreCount { genre, count }
        })
        .collect();

    let summary = RatingSummary::from_values(&ratings);
    let mut analytics = ReadingAnalytics {
        shelves,
        top_genres: genres,
        ratings_given: summary.count,
        average_rating: (summary.count > 0).then_some(summary.average),
        insight: None,
    };

    if let Some(client) = generative {
        let turns = [ChatTurn::user(analytics.describe())];
        match client.generate(INSIGHT_INSTRUCTION, &turns).await {
            Ok(text) => analytics.insight = Some(text),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Reading insight generation failed");
            }
        }
    }

    Ok(analytics)
}
