pub mod book;
pub mod review;
pub mod shelf;
pub mod user;

pub use book::{
    secure_url, Book, NewBook, RecommendedBook, StoredBook, UNKNOWN_AUTHOR, UNKNOWN_GENRE,
};
pub use review::{Quote, RatingSummary, Review, ReviewWithUser};
pub use shelf::{HistoryEntry, ShelfCounts, ShelfStatus};
pub use user::UserProfile;
