pub mod analytics;
pub mod catalog;
pub mod dedup;
pub mod generative;
pub mod recommendations;

pub use catalog::{BookSource, Catalog};
pub use generative::GenerativeClient;
pub use recommendations::Recommender;
