use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use crate::pipeline::ChatPipeline;

pub const MESSAGE_REQUIRED: &str = "Message is required";
pub const INTERNAL_ERROR_MESSAGE: &str = "An error occurred while processing your request";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: Value,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// `POST {prefix}/chat` takes `{"message": "..."}` and answers with
/// `{"response": ...}`, or `{"error": "..."}` with a 400/500 status.
pub fn router(pipeline: ChatPipeline, prefix: &str) -> Router {
    let prefix = prefix.trim_matches('/');
    let chat = if prefix.is_empty() {
        "/chat".to_string()
    } else {
        format!("/{}/chat", prefix)
    };

    Router::new()
        .route("/health", get(health))
        .route(&chat, post(chat_handler))
        .route(&format!("{}/", chat), post(chat_handler))
        .with_state(pipeline)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat_handler(
    State(pipeline): State<ChatPipeline>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.is_empty() {
        return Err(ApiError::bad_request(MESSAGE_REQUIRED));
    }

    match pipeline.handle(&request.message).await {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(e) if e.is_client_error() => Err(ApiError::bad_request(e.to_string())),
        Err(e) => {
            error!(error = %e, "error in chat endpoint");
            Err(ApiError::internal())
        }
    }
}
