use std::sync::Arc;

use axum::{extract::State, Json};

use crate::{
    api::AppState,
    error::AppResult,
    middleware::CurrentUser,
    services::analytics::{reading_analytics, ReadingAnalytics},
};

/// Handler for the caller's reading analytics
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<ReadingAnalytics>> {
    let analytics =
        reading_analytics(state.store.as_ref(), state.generative.as_ref(), &user_id).await?;
    Ok(Json(analytics))
}
