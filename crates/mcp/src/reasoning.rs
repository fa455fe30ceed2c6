use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response format")]
    UnexpectedResponse,
}

/// Prompt in, completion text out.
///
/// Treated as unreliable: callers absorb every failure into a safe default.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ReasoningError>;
}

/// Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }
}

pub(crate) fn completion_text(response: &Value) -> Option<String> {
    response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl ReasoningClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Status { status, body });
        }

        let data: Value = response.json().await?;
        completion_text(&data).ok_or(ReasoningError::UnexpectedResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_candidate_text() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"tool_name\": \"get_monkeys\"}" }] }
            }]
        });
        assert_eq!(
            completion_text(&response).as_deref(),
            Some("{\"tool_name\": \"get_monkeys\"}")
        );
    }

    #[test]
    fn missing_candidates_yield_none() {
        assert!(completion_text(&json!({"candidates": []})).is_none());
        assert!(completion_text(&json!({"error": {"code": 400}})).is_none());
    }
}
