use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::{
    api::AppState,
    middleware::{MaybeUser, RequestId},
    models::RecommendedBook,
};

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<RecommendedBook>,
}

/// Handler for recommendations endpoint
///
/// Never fails: the recommender degrades to random picks or an empty list.
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    MaybeUser(user_id): MaybeUser,
) -> Json<RecommendationsResponse> {
    let recommendations = state.recommender.recommend(user_id.as_deref()).await;
    tracing::info!(
        request_id = %request_id,
        user_id = user_id.as_deref().unwrap_or("anonymous"),
        results = recommendations.len(),
        "Recommendations served"
    );
    Json(RecommendationsResponse { recommendations })
}
