/// Persistence for user-owned data
///
/// The aggregation and recommendation services only see the `BookStore` trait.
/// `PostgresStore` backs production; `MemoryStore` backs tests and local runs.
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        HistoryEntry, NewBook, Quote, RatingSummary, Review, ReviewWithUser, ShelfCounts,
        ShelfStatus, StoredBook, UserProfile,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{create_pool, PostgresStore};

/// Store for books, shelves, ratings, reviews and quotes
///
/// Every call is consistent on its own. Callers that issue several writes
/// (a review followed by its rating) get no atomicity across them.
#[async_trait::async_trait]
pub trait BookStore: Send + Sync {
    /// Creates or refreshes a user profile
    async fn upsert_user(&self, user: &UserProfile) -> AppResult<()>;

    /// Creates the book or refreshes its metadata, keyed by external id.
    /// A known author or genre is never overwritten by its unknown placeholder.
    async fn upsert_book(&self, book: &NewBook) -> AppResult<StoredBook>;

    async fn find_book(&self, external_id: &str) -> AppResult<Option<StoredBook>>;

    /// Sets the shelf status for (user, book); the latest status wins
    async fn upsert_shelf_status(
        &self,
        user_id: &str,
        book_id: Uuid,
        status: ShelfStatus,
    ) -> AppResult<()>;

    async fn shelf_status(&self, user_id: &str, book_id: Uuid) -> AppResult<Option<ShelfStatus>>;

    /// Books the user is reading or has read, most recently updated first
    async fn user_history(&self, user_id: &str) -> AppResult<Vec<HistoryEntry>>;

    async fn shelf_counts(&self, user_id: &str) -> AppResult<ShelfCounts>;

    /// Sets the user's rating for a book; the latest value wins
    async fn upsert_rating(&self, user_id: &str, book_id: Uuid, value: i32) -> AppResult<()>;

    async fn rating_summary(&self, book_id: Uuid) -> AppResult<RatingSummary>;

    /// Every rating value the user has given
    async fn ratings_by_user(&self, user_id: &str) -> AppResult<Vec<i32>>;

    /// Appends a review. Reviews are never deduplicated.
    async fn create_review(
        &self,
        user_id: &str,
        book_id: Uuid,
        content: &str,
        rating: i32,
    ) -> AppResult<Review>;

    /// Reviews for a book, newest first
    async fn reviews_for_book(&self, book_id: Uuid) -> AppResult<Vec<ReviewWithUser>>;

    async fn add_quote(
        &self,
        user_id: &str,
        book_id: Uuid,
        content: &str,
        page: Option<i32>,
    ) -> AppResult<Quote>;

    /// The user's quotes, newest first, optionally restricted to one book
    async fn quotes_for_user(&self, user_id: &str, book_id: Option<Uuid>) -> AppResult<Vec<Quote>>;

    /// Returns false when no quote with that id belongs to the user
    async fn delete_quote(&self, user_id: &str, quote_id: Uuid) -> AppResult<bool>;
}
