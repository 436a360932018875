/// Generative-language provider used for chat and reading insights
///
/// The provider is an opaque text-in/text-out function. `GeminiClient` speaks the
/// `models/{model}:generateContent` endpoint.
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One turn of a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[async_trait::async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Produces the next model turn for `turns`, guided by `system`
    async fn generate(&self, system: &str, turns: &[ChatTurn]) -> AppResult<String>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    api_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(http_client: HttpClient, api_url: String, api_key: String, model: String) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

/// Request body for `generateContent`
pub fn build_request(system: &str, turns: &[ChatTurn]) -> Value {
    let contents: Vec<Value> = turns
        .iter()
        .map(|turn| {
            json!({
                "role": turn.role,
                "parts": [{ "text": turn.content }]
            })
        })
        .collect();

    json!({
        "systemInstruction": { "parts": [{ "text": system }] },
        "contents": contents
    })
}

/// Text of the first candidate, or `None` when the payload carries none
pub fn extract_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[async_trait::async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, system: &str, turns: &[ChatTurn]) -> AppResult<String> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&build_request(system, turns))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Generative API request failed");
            return Err(AppError::ExternalApi(format!(
                "Generative API returned status {}",
                status
            )));
        }

        let body: Value = response.json().await?;
        let text = extract_text(&body).ok_or_else(|| {
            AppError::ExternalApi("Generative API returned no text".to_string())
        })?;

        tracing::debug!(model = %self.model, chars = text.len(), "Generated text");

        Ok(text)
    }
}
