use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::{AppJson, AppState},
    error::{require_field, AppError, AppResult},
    middleware::{MaybeUser, RequestId},
    models::RatingSummary,
};

use super::{check_acting_user, validate_rating};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingsQuery {
    pub book_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub book_id: Option<String>,
    pub user_id: Option<String>,
    pub value: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateResponse {
    pub book_id: String,
    pub user_id: String,
    pub value: i32,
    pub summary: RatingSummary,
}

/// Average and count for a book; zeroes when the book was never stored
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RatingsQuery>,
) -> AppResult<Json<RatingSummary>> {
    let external_id = require_field(params.book_id, "bookId")?;

    let summary = match state.store.find_book(&external_id).await? {
        Some(book) => state.store.rating_summary(book.id).await?,
        None => RatingSummary::from_values(&[]),
    };

    Ok(Json(summary))
}

/// Creates or replaces the user's rating for a stored book
pub async fn rate(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    MaybeUser(caller): MaybeUser,
    AppJson(request): AppJson<RateRequest>,
) -> AppResult<Json<RateResponse>> {
    let external_id = require_field(request.book_id, "bookId")?;
    let user_id = require_field(request.user_id, "userId")?;
    let value = request
        .value
        .ok_or_else(|| AppError::InvalidInput("Missing required field: value".to_string()))
        .and_then(validate_rating)?;
    check_acting_user(&user_id, caller.as_deref())?;

    let book = state
        .store
        .find_book(&external_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", external_id)))?;

    state.store.upsert_rating(&user_id, book.id, value).await?;
    let summary = state.store.rating_summary(book.id).await?;

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        external_id = %external_id,
        value = value,
        count = summary.count,
        "Rating recorded"
    );

    Ok(Json(RateResponse {
        book_id: external_id,
        user_id,
        value,
        summary,
    }))
}
