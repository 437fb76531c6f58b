use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use pdfchat_graph::{SessionError, TurnOutcome};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{
    error::{ApiError, ApiResult},
    routes::messages::SendMessageRequest,
    state::AppState,
};

enum TurnEvent {
    Fragment(String),
    Answer(TurnOutcome),
    Error(String),
}

/// Ask a question and stream the answer using Server-Sent Events
///
/// `fragment` events carry raw model text as it arrives; the closing
/// `answer` event carries the sanitized answer that was stored. A provider
/// failure ends the stream with an `error` event instead.
pub async fn send_message_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if req.content.trim().is_empty() {
        return Err(SessionError::EmptyQuestion.into());
    }

    let mut session = state.try_session()?;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let fragments = tx.clone();
        let result = session
            .submit_stream(&req.content, move |fragment| {
                // Receiver gone means the client left; the turn still completes
                let _ = fragments.send(TurnEvent::Fragment(fragment.to_string()));
            })
            .await;

        let last = match result {
            Ok(outcome) => TurnEvent::Answer(outcome),
            Err(e) => TurnEvent::Error(ApiError::from(e).to_string()),
        };
        let _ = tx.send(last);
    });

    let sse_stream = UnboundedReceiverStream::new(rx).map(|event| {
        let sse_event = match event {
            TurnEvent::Fragment(content) => Event::default()
                .event("fragment")
                .json_data(serde_json::json!({ "content": content })),
            TurnEvent::Answer(outcome) => Event::default()
                .event("answer")
                .json_data(serde_json::json!({
                    "thread_id": outcome.thread_id.to_string(),
                    "answer": outcome.answer,
                    "fallback": outcome.fallback,
                })),
            TurnEvent::Error(message) => Event::default()
                .event("error")
                .json_data(serde_json::json!({ "error": message })),
        };

        Ok::<Event, Infallible>(sse_event.unwrap_or_else(|e| {
            tracing::error!("Failed to encode SSE event: {}", e);
            Event::default().event("error").data("encoding failed")
        }))
    });

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}
