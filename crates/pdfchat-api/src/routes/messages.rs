use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub thread_id: String,
    pub answer: String,
    pub fallback: bool,
}

/// Ask a question about the current thread's document
///
/// The turn runs on its own task holding the session lock, so a client
/// that disconnects early does not leave the session mid-turn.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    let mut session = state.try_session()?;

    let outcome = tokio::spawn(async move { session.submit(&request.content).await })
        .await
        .map_err(|e| ApiError::Internal(format!("turn task failed: {}", e)))??;

    Ok(Json(SendMessageResponse {
        thread_id: outcome.thread_id.to_string(),
        answer: outcome.answer,
        fallback: outcome.fallback,
    }))
}
