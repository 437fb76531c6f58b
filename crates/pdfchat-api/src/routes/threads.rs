use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pdfchat_graph::{SessionController, SessionError};
use pdfchat_store::{Message, Thread, ThreadId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct ThreadResponse {
    pub thread_id: String,
    pub label: String,
    pub message_count: usize,
}

impl From<&Thread> for ThreadResponse {
    fn from(thread: &Thread) -> Self {
        Self {
            thread_id: thread.id.to_string(),
            label: thread.label(),
            message_count: thread.messages.len(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListThreadsResponse {
    pub threads: Vec<ThreadResponse>,
    pub current: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub thread_id: String,
    pub messages: Vec<Message>,
}

/// "New chat": open a fresh thread and make it current
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<ThreadResponse>)> {
    let mut session = state.try_session()?;
    let thread_id = session.new_chat();
    let thread = thread_response(&session, &thread_id)?;

    Ok((StatusCode::CREATED, Json(thread)))
}

/// Threads in creation order, plus the current one
pub async fn list_threads(State(state): State<Arc<AppState>>) -> Json<ListThreadsResponse> {
    let session = state.session.lock().await;

    Json(ListThreadsResponse {
        threads: session.threads().map(ThreadResponse::from).collect(),
        current: session.current_thread().to_string(),
    })
}

pub async fn select_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadResponse>> {
    let mut session = state.try_session()?;
    let thread_id = ThreadId::from(thread_id);
    session.select_thread(&thread_id)?;

    Ok(Json(thread_response(&session, &thread_id)?))
}

/// Transcript of the current thread
pub async fn current_messages(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<TranscriptResponse>> {
    let session = state.session.lock().await;
    let thread_id = session.current_thread().clone();
    transcript(&session, &thread_id)
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<TranscriptResponse>> {
    let session = state.session.lock().await;
    transcript(&session, &ThreadId::from(thread_id))
}

fn transcript(session: &SessionController, thread_id: &ThreadId) -> ApiResult<Json<TranscriptResponse>> {
    let messages = session.messages(thread_id)?;

    Ok(Json(TranscriptResponse {
        thread_id: thread_id.to_string(),
        messages: messages.to_vec(),
    }))
}

fn thread_response(session: &SessionController, thread_id: &ThreadId) -> ApiResult<ThreadResponse> {
    let thread = session
        .context()
        .store()
        .thread(thread_id)
        .map_err(SessionError::from)?;
    Ok(ThreadResponse::from(thread))
}
