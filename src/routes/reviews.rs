use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::{AppJson, AppState},
    error::{require_field, AppError, AppResult},
    middleware::{MaybeUser, RequestId},
    models::{Review, ReviewWithUser},
};

use super::{check_acting_user, upsert_book_from_hints, validate_rating, BookHints};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub user_id: Option<String>,
    pub content: Option<String>,
    pub rating: Option<i32>,
    pub cover_url: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsQuery {
    pub book_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub review: Review,
}

#[derive(Debug, Serialize)]
pub struct ReviewsResponse {
    pub reviews: Vec<ReviewWithUser>,
}

/// Writes a review and records its rating
///
/// The book is created on first review. The review and the rating upsert are
/// two separate writes.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    MaybeUser(caller): MaybeUser,
    AppJson(request): AppJson<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<ReviewResponse>)> {
    let external_id = require_field(request.external_id, "externalId")?;
    let title = require_field(request.title, "title")?;
    let author = require_field(request.author, "author")?;
    let user_id = require_field(request.user_id, "userId")?;
    let content = require_field(request.content, "content")?;
    let rating = request
        .rating
        .ok_or_else(|| AppError::InvalidInput("Missing required field: rating".to_string()))
        .and_then(validate_rating)?;
    check_acting_user(&user_id, caller.as_deref())?;

    let hints = BookHints {
        title: Some(title),
        author: Some(author),
        cover_url: request.cover_url,
        genre: request.genre,
    };
    let book = upsert_book_from_hints(&state, &external_id, hints).await?;

    let review = state
        .store
        .create_review(&user_id, book.id, &content, rating)
        .await?;
    state.store.upsert_rating(&user_id, book.id, rating).await?;

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        external_id = %external_id,
        rating = rating,
        "Review created"
    );

    Ok((StatusCode::CREATED, Json(ReviewResponse { review })))
}

/// Reviews for a book, newest first; empty when the book was never stored
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReviewsQuery>,
) -> AppResult<Json<ReviewsResponse>> {
    let external_id = require_field(params.book_id, "bookId")?;

    let reviews = match state.store.find_book(&external_id).await? {
        Some(book) => state.store.reviews_for_book(book.id).await?,
        None => Vec::new(),
    };

    Ok(Json(ReviewsResponse { reviews }))
}
