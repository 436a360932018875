use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{AppJson, AppState},
    error::{require_field, AppError, AppResult},
    middleware::{CurrentUser, RequestId},
    models::{Quote, StoredBook},
};

use super::{upsert_book_from_hints, BookHints};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    pub external_id: Option<String>,
    pub content: Option<String>,
    pub page: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotesQuery {
    pub book_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub quote: Quote,
}

#[derive(Debug, Serialize)]
pub struct QuotesResponse {
    pub quotes: Vec<Quote>,
}

/// Stored book for a quote, created from the catalog when first seen
async fn quoted_book(state: &AppState, external_id: &str) -> AppResult<StoredBook> {
    if let Some(book) = state.store.find_book(external_id).await? {
        return Ok(book);
    }
    upsert_book_from_hints(state, external_id, BookHints::default())
        .await
        .map_err(|e| match e {
            AppError::InvalidInput(_) => {
                AppError::NotFound(format!("Book {} not found", external_id))
            }
            other => other,
        })
}

/// Saves a passage from a book for the caller
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    AppJson(request): AppJson<CreateQuoteRequest>,
) -> AppResult<(StatusCode, Json<QuoteResponse>)> {
    let external_id = require_field(request.external_id, "externalId")?;
    let content = require_field(request.content, "content")?;
    if matches!(request.page, Some(page) if page < 1) {
        return Err(AppError::InvalidInput("page must be positive".to_string()));
    }

    let book = quoted_book(&state, &external_id).await?;
    let quote = state
        .store
        .add_quote(&user_id, book.id, &content, request.page)
        .await?;

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        external_id = %external_id,
        quote_id = %quote.id,
        "Quote saved"
    );

    Ok((StatusCode::CREATED, Json(QuoteResponse { quote })))
}

/// The caller's quotes, newest first, optionally for one book
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<QuotesQuery>,
) -> AppResult<Json<QuotesResponse>> {
    let external_id = params
        .book_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let quotes = match external_id {
        Some(external_id) => match state.store.find_book(external_id).await? {
            Some(book) => state.store.quotes_for_user(&user_id, Some(book.id)).await?,
            None => Vec::new(),
        },
        None => state.store.quotes_for_user(&user_id, None).await?,
    };

    Ok(Json(QuotesResponse { quotes }))
}

/// Deletes one of the caller's quotes
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Path(quote_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !state.store.delete_quote(&user_id, quote_id).await? {
        return Err(AppError::NotFound(format!("Quote {} not found", quote_id)));
    }

    tracing::info!(request_id = %request_id, user_id = %user_id, quote_id = %quote_id, "Quote deleted");
    Ok(StatusCode::NO_CONTENT)
}
