use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    middleware::RequestId,
    models::Book,
};

#[derive(Debug, Deserialize)]
pub struct BooksQuery {
    pub q: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BooksResponse {
    Search { books: Vec<Book> },
    Single { book: Book },
}

/// Handler for catalog search (`?q=`) and lookup (`?id=`)
///
/// `id` wins when both are given.
pub async fn get_books(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<BooksQuery>,
) -> AppResult<Json<BooksResponse>> {
    if let Some(id) = params.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        tracing::debug!(request_id = %request_id, id = %id, "Fetching book by id");
        return match state.catalog.fetch_by_id(id).await {
            Some(book) => Ok(Json(BooksResponse::Single { book })),
            None => Err(AppError::NotFound(format!("Book {} not found", id))),
        };
    }

    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| {
            AppError::InvalidInput("Missing required query parameter: q or id".to_string())
        })?;

    let books = state.catalog.search_merged(query).await;
    tracing::info!(
        request_id = %request_id,
        query = %query,
        results = books.len(),
        "Book search completed"
    );

    Ok(Json(BooksResponse::Search { books }))
}
