use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdfchat_graph::SessionError;
use pdfchat_store::StoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("A question is already awaiting a response")]
    Busy,

    /// Provider failure; the message is shown to the user as-is
    #[error("{0}")]
    Llm(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        let message = error.to_string();
        match error {
            SessionError::UnknownThread(StoreError::ThreadNotFound(id)) => ApiError::ThreadNotFound(id),
            SessionError::EmptyQuestion => ApiError::BadRequest(message),
            SessionError::Busy => ApiError::Busy,
            SessionError::LlmInvocation(_) => ApiError::Llm(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::ThreadNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Busy => StatusCode::CONFLICT,
            ApiError::Llm(ref message) => {
                tracing::warn!("LLM error: {}", message);
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
