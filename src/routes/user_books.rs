use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::{AppJson, AppState},
    error::{require_field, AppError, AppResult},
    middleware::{CurrentUser, RequestId},
    models::ShelfStatus,
};

use super::{upsert_book_from_hints, BookHints};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub external_book_id: Option<String>,
    pub status: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBookResponse {
    pub external_book_id: String,
    pub status: ShelfStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: Option<ShelfStatus>,
}

/// Puts a book on one of the caller's shelves
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    AppJson(request): AppJson<SetStatusRequest>,
) -> AppResult<Json<UserBookResponse>> {
    let external_id = require_field(request.external_book_id, "externalBookId")?;
    let status: ShelfStatus = require_field(request.status, "status")?
        .parse()
        .map_err(AppError::InvalidInput)?;

    let hints = BookHints {
        title: request.title,
        author: request.author,
        cover_url: request.cover_url,
        genre: request.genre,
    };
    let book = upsert_book_from_hints(&state, &external_id, hints).await?;
    state
        .store
        .upsert_shelf_status(&user_id, book.id, status)
        .await?;

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        external_id = %external_id,
        status = %status,
        genre = %book.genre,
        "Shelf status updated"
    );

    Ok(Json(UserBookResponse {
        external_book_id: external_id,
        status,
    }))
}

/// The caller's shelf status for one book, `null` when unshelved
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(external_id): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    let status = match state.store.find_book(&external_id).await? {
        Some(book) => state.store.shelf_status(&user_id, book.id).await?,
        None => None,
    };
    Ok(Json(StatusResponse { status }))
}
