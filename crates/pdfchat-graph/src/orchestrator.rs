use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use pdfchat_llm::{ChatClient, ChatOptions, ChatRequest, Message, StreamEvent};
use std::pin::Pin;
use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::templates::pdf_assistant_prompt;

/// Lazy, finite stream of raw answer fragments. It cannot be restarted;
/// sanitize only the concatenation of everything it yields.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Builds the prompt for one question and invokes the model.
///
/// Each call is independent: the prompt holds the system instruction with the
/// document excerpt and the latest question, never earlier turns.
pub struct TurnOrchestrator {
    client: Arc<dyn ChatClient>,
    config: OrchestratorConfig,
}

impl TurnOrchestrator {
    pub fn new(client: Arc<dyn ChatClient>, config: OrchestratorConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The exact message list sent for `question` against `document`
    pub fn build_messages(&self, question: &str, document: &str) -> Vec<Message> {
        let excerpt = excerpt(document, self.config.excerpt_chars);
        vec![
            Message::system(pdf_assistant_prompt(excerpt)),
            Message::human(question),
        ]
    }

    fn build_request(&self, question: &str, document: &str) -> Result<ChatRequest> {
        anyhow::ensure!(!question.trim().is_empty(), "question must not be empty");

        let mut options = ChatOptions::new();
        if let Some(temp) = self.config.temperature {
            options = options.temperature(temp);
        }

        tracing::debug!(
            model = %self.config.model,
            document_chars = document.chars().count(),
            excerpt_limit = self.config.excerpt_chars,
            "building turn prompt"
        );

        Ok(ChatRequest::new(self.config.model.clone(), self.build_messages(question, document))
            .with_options(options))
    }

    /// Ask the model and return its raw text, unmodified. Failures are not
    /// retried.
    pub async fn produce_answer(&self, question: &str, document: &str) -> Result<String> {
        let request = self.build_request(question, document)?;

        let response = self
            .client
            .chat(request)
            .await
            .context("LLM invocation failed")?;

        Ok(response.content.unwrap_or_default())
    }

    /// Streaming variant of [`produce_answer`](Self::produce_answer)
    pub async fn produce_answer_stream(
        &self,
        question: &str,
        document: &str,
    ) -> Result<FragmentStream> {
        let request = self.build_request(question, document)?;

        let events = self
            .client
            .chat_stream(request)
            .await
            .context("LLM invocation failed")?;

        let fragments = events.filter_map(|event| async move {
            match event {
                Ok(StreamEvent::Message { content }) => Some(Ok(content)),
                Ok(StreamEvent::Done { .. }) => None,
                Err(e) => Some(Err(e.context("LLM stream failed"))),
            }
        });

        Ok(Box::pin(fragments))
    }
}

/// First `max_chars` characters of `text`. Never splits a code point.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
