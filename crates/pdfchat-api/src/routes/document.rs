use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub thread_id: String,
    /// Characters of text extracted; zero for unreadable files
    pub characters: usize,
}

/// Attach a PDF (raw request body) to the current thread
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<UploadResponse>> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty document".to_string()));
    }

    let mut session = state.try_session()?;
    let characters = session.upload_document(&body)?;

    Ok(Json(UploadResponse {
        thread_id: session.current_thread().to_string(),
        characters,
    }))
}
