use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    models::{secure_url, NewBook, StoredBook, UNKNOWN_AUTHOR, UNKNOWN_GENRE},
};

pub mod analytics;
pub mod books;
pub mod chat;
pub mod quotes;
pub mod ratings;
pub mod recommendations;
pub mod reviews;
pub mod user_books;
pub mod users;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Book details a client sent alongside an external id
#[derive(Debug, Clone, Default)]
pub struct BookHints {
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub genre: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Stores (or refreshes) the book behind `external_id`
///
/// Missing title or genre is filled from the catalog record when one can be
/// fetched. A book with no title from either place is only accepted if it is
/// already stored.
pub async fn upsert_book_from_hints(
    state: &AppState,
    external_id: &str,
    hints: BookHints,
) -> AppResult<StoredBook> {
    let title = non_blank(hints.title);
    let genre = non_blank(hints.genre);

    let record = if title.is_none() || genre.is_none() {
        state.catalog.fetch_by_id(external_id).await
    } else {
        None
    };

    let Some(title) = title.or_else(|| record.as_ref().map(|b| b.title.clone())) else {
        return state
            .store
            .find_book(external_id)
            .await?
            .ok_or_else(|| AppError::InvalidInput("Missing required field: title".to_string()));
    };

    let book = NewBook {
        external_id: external_id.to_string(),
        title,
        author: non_blank(hints.author)
            .or_else(|| record.as_ref().map(|b| b.primary_author().to_string()))
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        cover_url: non_blank(hints.cover_url)
            .or_else(|| record.as_ref().and_then(|b| b.cover_url.clone()))
            .map(|url| secure_url(&url)),
        genre: genre
            .or_else(|| {
                record
                    .as_ref()
                    .and_then(|b| b.primary_category().map(ToOwned::to_owned))
            })
            .unwrap_or_else(|| UNKNOWN_GENRE.to_string()),
    };

    state.store.upsert_book(&book).await
}

/// Rejects a body `userId` that disagrees with the authenticated caller
pub fn check_acting_user(body_user_id: &str, caller: Option<&str>) -> AppResult<()> {
    match caller {
        Some(caller) if caller != body_user_id => Err(AppError::Unauthorized(
            "userId does not match the authenticated user".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Ratings are whole stars from 1 to 5
pub fn validate_rating(value: i32) -> AppResult<i32> {
    if (1..=5).contains(&value) {
        Ok(value)
    } else {
        Err(AppError::InvalidInput(format!(
            "Rating must be between 1 and 5, got {}",
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_check_acting_user() {
        assert_ok!(check_acting_user("u1", None));
        assert_ok!(check_acting_user("u1", Some("u1")));
        assert_err!(check_acting_user("u1", Some("u2")));
    }

    #[test]
    fn test_validate_rating() {
        assert_eq!(validate_rating(1).unwrap(), 1);
        assert_eq!(validate_rating(5).unwrap(), 5);
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some(" Dune ".to_string())).as_deref(), Some("Dune"));
        assert_eq!(non_blank(None), None);
    }
}
