use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::{
    api::{AppJson, AppState},
    error::AppResult,
    middleware::{CurrentUser, RequestId},
    models::UserProfile,
};

use super::check_acting_user;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUserRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserProfile,
}

/// Creates or refreshes the caller's public profile shown next to reviews
///
/// A body `id` is optional and must name the caller.
pub async fn upsert(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(caller): CurrentUser,
    AppJson(request): AppJson<UpsertUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let id = request
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| caller.clone());
    check_acting_user(&id, Some(&caller))?;

    let user = UserProfile {
        id,
        name: request.name.filter(|n| !n.trim().is_empty()),
        image_url: request.image_url.filter(|u| !u.trim().is_empty()),
    };
    state.store.upsert_user(&user).await?;

    tracing::info!(request_id = %request_id, user_id = %user.id, "User profile upserted");
    Ok(Json(UserResponse { user }))
}
