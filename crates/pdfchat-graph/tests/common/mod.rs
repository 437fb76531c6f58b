#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use pdfchat_graph::{OrchestratorConfig, SessionController, TextExtractor, TurnOrchestrator};
use pdfchat_llm::{ChatClient, ChatRequest, ChatResponse, EventStream, StreamEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub enum Reply {
    Text(String),
    Fail(String),
    /// Streams the text, then fails
    Broken(String),
    /// Never answers
    Hang,
}

/// Scripted chat client that records every request it receives
#[derive(Default)]
pub struct MockChatClient {
    requests: Mutex<Vec<ChatRequest>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl MockChatClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replying(texts: &[&str]) -> Arc<Self> {
        let client = Self::new();
        for text in texts {
            client.push(Reply::Text(text.to_string()));
        }
        client
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, request: ChatRequest) -> Reply {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Text(String::new()))
    }
}

fn fragments(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(4).map(|c| c.iter().collect()).collect()
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        match self.next_reply(request) {
            Reply::Text(text) => Ok(ChatResponse {
                content: Some(text),
                usage: None,
                finish_reason: Some("stop".to_string()),
                raw: serde_json::Value::Null,
            }),
            Reply::Fail(message) | Reply::Broken(message) => Err(anyhow::anyhow!(message)),
            Reply::Hang => futures::future::pending().await,
        }
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let (text, broken) = match self.next_reply(request) {
            Reply::Text(text) => (text, false),
            Reply::Broken(text) => (text, true),
            Reply::Fail(message) => return Err(anyhow::anyhow!(message)),
            Reply::Hang => futures::future::pending().await,
        };

        let mut events: Vec<Result<StreamEvent>> = fragments(&text)
            .into_iter()
            .map(|content| Ok(StreamEvent::Message { content }))
            .collect();
        if broken {
            events.push(Err(anyhow::anyhow!("connection reset")));
        } else {
            events.push(Ok(StreamEvent::Done {
                finish_reason: Some("stop".to_string()),
            }));
        }

        Ok(Box::pin(futures::stream::iter(events)))
    }
}

/// Treats the uploaded bytes as UTF-8 text
pub struct Utf8Extractor;

impl TextExtractor for Utf8Extractor {
    fn extract(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

pub fn orchestrator(client: Arc<MockChatClient>) -> TurnOrchestrator {
    TurnOrchestrator::new(client, OrchestratorConfig::default())
}

pub fn controller(client: Arc<MockChatClient>) -> SessionController {
    SessionController::new(orchestrator(client), Arc::new(Utf8Extractor))
}
