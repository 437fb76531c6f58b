use std::collections::HashMap;

use crate::error::{Result, StoreError};
use crate::models::{Message, MessageRole, Thread, ThreadId};

/// Thread map for a single session.
///
/// Threads are kept in creation order and never evicted; they live as long
/// as the store does.
#[derive(Debug, Default)]
pub struct ConversationStore {
    order: Vec<ThreadId>,
    threads: HashMap<ThreadId, Thread>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new empty thread and return its identifier
    pub fn create_thread(&mut self) -> ThreadId {
        let id = ThreadId::generate();
        self.threads.insert(id.clone(), Thread::new(id.clone()));
        self.order.push(id.clone());

        tracing::debug!(thread_id = %id, total = self.order.len(), "thread created");
        id
    }

    pub fn append(
        &mut self,
        thread_id: &ThreadId,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<()> {
        let thread = self.thread_mut(thread_id)?;
        thread.messages.push(Message::new(role, content));
        Ok(())
    }

    /// Thread identifiers in creation order
    pub fn list_threads(&self) -> &[ThreadId] {
        &self.order
    }

    pub fn get_messages(&self, thread_id: &ThreadId) -> Result<&[Message]> {
        Ok(&self.thread(thread_id)?.messages)
    }

    /// Replace the thread's document snapshot
    pub fn set_document(&mut self, thread_id: &ThreadId, text: impl Into<String>) -> Result<()> {
        self.thread_mut(thread_id)?.pdf_content = text.into();
        Ok(())
    }

    pub fn get_document(&self, thread_id: &ThreadId) -> Result<&str> {
        Ok(&self.thread(thread_id)?.pdf_content)
    }

    pub fn thread(&self, thread_id: &ThreadId) -> Result<&Thread> {
        self.threads
            .get(thread_id)
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))
    }

    pub fn contains(&self, thread_id: &ThreadId) -> bool {
        self.threads.contains_key(thread_id)
    }

    fn thread_mut(&mut self, thread_id: &ThreadId) -> Result<&mut Thread> {
        self.threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))
    }
}
