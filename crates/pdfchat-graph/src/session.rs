use futures::StreamExt;
use pdfchat_store::{ConversationStore, Message, MessageRole, StoreError, Thread, ThreadId};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{Result, SessionError};
use crate::extract::TextExtractor;
use crate::orchestrator::TurnOrchestrator;
use crate::sanitize;
use crate::templates::NOT_FOUND;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

/// Session-wide state: the thread map and the current-thread pointer.
///
/// Starts with one fresh thread selected, so `current` always names a
/// thread present in the store.
#[derive(Debug)]
pub struct SessionContext {
    store: ConversationStore,
    current: ThreadId,
}

impl SessionContext {
    pub fn new() -> Self {
        let mut store = ConversationStore::new();
        let current = store.create_thread();
        Self { store, current }
    }

    pub fn current(&self) -> &ThreadId {
        &self.current
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    fn open_thread(&mut self) -> ThreadId {
        let id = self.store.create_thread();
        self.current = id.clone();
        id
    }

    fn select(&mut self, thread_id: &ThreadId) -> std::result::Result<(), StoreError> {
        if !self.store.contains(thread_id) {
            return Err(StoreError::ThreadNotFound(thread_id.to_string()));
        }
        self.current = thread_id.clone();
        Ok(())
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one completed turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub thread_id: ThreadId,
    /// Text appended to the transcript
    pub answer: String,
    /// Model output before sanitizing
    pub raw: String,
    /// True when the cleaned answer was empty and `Not found` was stored
    pub fallback: bool,
}

/// Drives one user session: thread management, document uploads and
/// question/answer turns.
pub struct SessionController {
    context: SessionContext,
    orchestrator: TurnOrchestrator,
    extractor: Arc<dyn TextExtractor>,
    state: SessionState,
}

impl SessionController {
    pub fn new(orchestrator: TurnOrchestrator, extractor: Arc<dyn TextExtractor>) -> Self {
        let context = SessionContext::new();
        tracing::info!(thread_id = %context.current(), "session started");
        Self {
            context,
            orchestrator,
            extractor,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn current_thread(&self) -> &ThreadId {
        self.context.current()
    }

    /// Threads in creation order, for the sidebar
    pub fn threads(&self) -> impl Iterator<Item = &Thread> + '_ {
        let store = self.context.store();
        store
            .list_threads()
            .iter()
            .filter_map(move |id| store.thread(id).ok())
    }

    /// Transcript of the current thread
    pub fn transcript(&self) -> Result<&[Message]> {
        self.messages(self.context.current())
    }

    pub fn messages(&self, thread_id: &ThreadId) -> Result<&[Message]> {
        Ok(self.context.store().get_messages(thread_id)?)
    }

    /// Document text of the current thread
    pub fn document(&self) -> Result<&str> {
        Ok(self.context.store().get_document(self.context.current())?)
    }

    /// Start a new thread with empty transcript and document, and make it
    /// current
    pub fn new_chat(&mut self) -> ThreadId {
        let id = self.context.open_thread();
        tracing::info!(thread_id = %id, "new chat");
        id
    }

    pub fn select_thread(&mut self, thread_id: &ThreadId) -> Result<()> {
        self.context.select(thread_id)?;
        tracing::info!(thread_id = %thread_id, "thread selected");
        Ok(())
    }

    /// Extract `bytes` and attach the text to the current thread, replacing
    /// any earlier document. Returns the extracted character count.
    pub fn upload_document(&mut self, bytes: &[u8]) -> Result<usize> {
        let text = self.extractor.extract(bytes);
        let characters = text.chars().count();
        let thread_id = self.context.current().clone();

        self.context.store.set_document(&thread_id, text)?;

        tracing::info!(
            thread_id = %thread_id,
            bytes = bytes.len(),
            characters,
            "document uploaded"
        );
        Ok(characters)
    }

    /// Answer `question` against the current thread's document
    pub async fn submit(&mut self, question: &str) -> Result<TurnOutcome> {
        let (thread_id, document) = self.begin_turn(question)?;

        let turn = TurnGuard::enter(&mut self.state, &thread_id);
        let result = self.orchestrator.produce_answer(question, &document).await;
        turn.finish();

        self.complete_turn(thread_id, question, result)
    }

    /// Like [`submit`](Self::submit), handing raw fragments to `on_fragment`
    /// as they arrive. Sanitizing happens once, on the full text.
    pub async fn submit_stream<F>(&mut self, question: &str, on_fragment: F) -> Result<TurnOutcome>
    where
        F: FnMut(&str) + Send,
    {
        let (thread_id, document) = self.begin_turn(question)?;

        let turn = TurnGuard::enter(&mut self.state, &thread_id);
        let result = collect_fragments(&self.orchestrator, question, &document, on_fragment).await;
        turn.finish();

        self.complete_turn(thread_id, question, result)
    }

    fn begin_turn(&mut self, question: &str) -> Result<(ThreadId, String)> {
        if self.state != SessionState::Idle {
            return Err(SessionError::Busy);
        }
        if question.trim().is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let thread_id = self.context.current().clone();
        self.context
            .store
            .append(&thread_id, MessageRole::User, question)?;
        let document = self.context.store().get_document(&thread_id)?.to_string();

        tracing::info!(
            thread_id = %thread_id,
            document_chars = document.chars().count(),
            "question submitted"
        );

        Ok((thread_id, document))
    }

    fn complete_turn(
        &mut self,
        thread_id: ThreadId,
        question: &str,
        result: anyhow::Result<String>,
    ) -> Result<TurnOutcome> {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(thread_id = %thread_id, error = %format!("{:#}", e), "turn failed");
                return Err(SessionError::LlmInvocation(e));
            }
        };

        let cleaned = sanitize::clean(&raw, question);
        let fallback = cleaned.is_empty();
        let answer = if fallback { NOT_FOUND.to_string() } else { cleaned };

        self.context
            .store
            .append(&thread_id, MessageRole::Assistant, answer.clone())?;

        tracing::info!(thread_id = %thread_id, fallback, "turn completed");

        Ok(TurnOutcome {
            thread_id,
            answer,
            raw,
            fallback,
        })
    }
}

/// Keeps the session in `AwaitingResponse` while the model call is pending.
///
/// Dropping it returns the session to `Idle`, so a turn whose future is
/// dropped mid-call (timeout, aborted task) does not leave the session busy.
/// The question stays in the transcript without an answer, as on failure.
struct TurnGuard<'a> {
    state: &'a mut SessionState,
    thread_id: ThreadId,
    finished: bool,
}

impl<'a> TurnGuard<'a> {
    fn enter(state: &'a mut SessionState, thread_id: &ThreadId) -> Self {
        *state = SessionState::AwaitingResponse;
        Self {
            state,
            thread_id: thread_id.clone(),
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        *self.state = SessionState::Idle;
        if !self.finished {
            tracing::warn!(thread_id = %self.thread_id, "turn abandoned before the model answered");
        }
    }
}

async fn collect_fragments<F>(
    orchestrator: &TurnOrchestrator,
    question: &str,
    document: &str,
    mut on_fragment: F,
) -> anyhow::Result<String>
where
    F: FnMut(&str) + Send,
{
    let mut fragments = orchestrator.produce_answer_stream(question, document).await?;

    let mut raw = String::new();
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        on_fragment(&fragment);
        raw.push_str(&fragment);
    }

    Ok(raw)
}
