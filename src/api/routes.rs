use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    routes::{analytics, books, chat, quotes, ratings, recommendations, reviews, user_books, users},
};

use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::routes::health_check))
        // Catalog
        .route("/books", get(books::get_books))
        .route("/recommendations", get(recommendations::recommend))
        // Shelves
        .route("/user-books", post(user_books::set_status))
        .route("/user-books/:id", get(user_books::get_status))
        // Reviews & ratings
        .route("/reviews", get(reviews::list).post(reviews::create))
        .route("/ratings", get(ratings::summary).post(ratings::rate))
        // Quotes
        .route("/quotes", get(quotes::list).post(quotes::create))
        .route("/quotes/:id", delete(quotes::remove))
        // AI features
        .route("/analytics", get(analytics::analytics))
        .route("/chat", post(chat::chat))
        // Profiles
        .route("/users", post(users::upsert))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}
