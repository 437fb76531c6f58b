use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::message::Message;

/// Opaque thread identifier (UUID v4 string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    /// Allocate a fresh, globally unique identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, used for sidebar labels
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ThreadId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ThreadId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One conversation and the document text it is answered from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub messages: Vec<Message>,
    pub pdf_content: String,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(id: ThreadId) -> Self {
        Self {
            id,
            messages: Vec::new(),
            pdf_content: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Sidebar label, e.g. `Chat 1a2b3c4d...`
    pub fn label(&self) -> String {
        format!("Chat {}...", self.id.short())
    }
}
