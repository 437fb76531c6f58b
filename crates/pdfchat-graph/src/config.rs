use serde::{Deserialize, Serialize};

use crate::templates::DEFAULT_EXCERPT_CHARS;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub model: String,
    pub temperature: Option<f32>,
    /// Characters of document text embedded in the prompt
    pub excerpt_chars: usize,
}

impl OrchestratorConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(0.0),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}
