use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::{
    api::{AppJson, AppState},
    error::{require_field, AppError, AppResult},
    middleware::RequestId,
    services::generative::ChatTurn,
};

/// Earlier turns beyond this are dropped before calling the provider
const MAX_HISTORY_TURNS: usize = 20;

const LIBRARIAN_INSTRUCTION: &str = "You are a knowledgeable, friendly librarian. \
Help the reader find books, discuss plots and themes without spoiling endings unless asked, \
and keep answers concise.";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Handler for the book assistant chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    AppJson(request): AppJson<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let message = require_field(request.message, "message")?;
    let client = state
        .generative
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Chat is not configured".to_string()))?;

    let skip = request.history.len().saturating_sub(MAX_HISTORY_TURNS);
    let mut turns: Vec<ChatTurn> = request.history.into_iter().skip(skip).collect();
    turns.push(ChatTurn::user(message));

    let reply = client.generate(LIBRARIAN_INSTRUCTION, &turns).await?;
    tracing::debug!(request_id = %request_id, turns = turns.len(), "Chat reply generated");

    Ok(Json(ChatResponse { reply }))
}
