use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::UserProfile;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub user_id: String,
    pub book_id: Uuid,
    pub content: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

/// Review with its author's profile embedded
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithUser {
    #[serde(flatten)]
    pub review: Review,
    pub user: UserProfile,
}

/// Average and count of ratings for one book
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

impl RatingSummary {
    pub fn from_values(values: &[i32]) -> Self {
        if values.is_empty() {
            return Self {
                average: 0.0,
                count: 0,
            };
        }
        let total: i64 = values.iter().map(|v| *v as i64).sum();
        Self {
            average: total as f64 / values.len() as f64,
            count: values.len() as i64,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: Uuid,
    pub user_id: String,
    pub book_id: Uuid,
    pub content: String,
    pub page: Option<i32>,
    pub created_at: DateTime<Utc>,
}
