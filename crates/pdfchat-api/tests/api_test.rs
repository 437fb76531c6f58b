use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pdfchat_api::{build_router, config::Config, state::AppState};
use pdfchat_graph::{OrchestratorConfig, SessionController, TextExtractor, TurnOrchestrator};
use pdfchat_llm::{ChatClient, ChatRequest, ChatResponse, EventStream, StreamEvent};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 0
max_upload_bytes = 1024

[cors]
enabled = false
origins = ["*"]

[llm]
model = "gemini-2.5-flash"
base_url = "http://localhost"
temperature = 0.0
excerpt_chars = 3000

[logging]
level = "debug"
format = "pretty"
"#;

/// Answers every request with the same text, or fails when it has none
struct FixedClient {
    answer: Option<String>,
    calls: Mutex<usize>,
}

impl FixedClient {
    fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(answer.to_string()),
            calls: Mutex::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn reply(&self) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        self.answer
            .clone()
            .ok_or_else(|| anyhow::anyhow!("quota exceeded"))
    }
}

#[async_trait]
impl ChatClient for FixedClient {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        Ok(ChatResponse {
            content: Some(self.reply()?),
            usage: None,
            finish_reason: Some("stop".to_string()),
            raw: Value::Null,
        })
    }

    async fn chat_stream(&self, _request: ChatRequest) -> Result<EventStream> {
        let text = self.reply()?;
        let (head, tail) = text.split_at(text.len() / 2);
        let events: Vec<Result<StreamEvent>> = vec![
            Ok(StreamEvent::Message { content: head.to_string() }),
            Ok(StreamEvent::Message { content: tail.to_string() }),
            Ok(StreamEvent::Done { finish_reason: None }),
        ];
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

struct Utf8Extractor;

impl TextExtractor for Utf8Extractor {
    fn extract(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn app_state(client: Arc<FixedClient>) -> Arc<AppState> {
    app_state_with(client, toml::from_str(CONFIG).unwrap())
}

fn app_state_with(client: Arc<FixedClient>, config: Config) -> Arc<AppState> {
    let orchestrator = TurnOrchestrator::new(client, OrchestratorConfig::from(&config.llm));
    let session = SessionController::new(orchestrator, Arc::new(Utf8Extractor));
    Arc::new(AppState::new(config, session))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send_json(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(build_router(state.clone()), request).await;
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_bytes(uri: &str, bytes: &'static [u8]) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/pdf")
        .body(Body::from(bytes))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let state = app_state(FixedClient::answering("x"));

    let (status, body) = send_json(&state, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "gemini-2.5-flash");
}

fn health_from(origin: &str) -> Request<Body> {
    Request::get("/health")
        .header("origin", origin)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_cors_disabled_grants_no_origin() {
    let state = app_state(FixedClient::answering("x"));

    let response = build_router(state)
        .oneshot(health_from("http://evil.example"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}

#[tokio::test]
async fn test_cors_enabled_allows_listed_origin() {
    let mut config: Config = toml::from_str(CONFIG).unwrap();
    config.cors.enabled = true;
    config.cors.origins = vec!["http://localhost:3000".to_string()];
    let state = app_state_with(FixedClient::answering("x"), config);

    let response = build_router(state.clone())
        .oneshot(health_from("http://localhost:3000"))
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );

    let response = build_router(state)
        .oneshot(health_from("http://evil.example"))
        .await
        .unwrap();
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}

#[tokio::test]
async fn test_create_and_list_threads() {
    let state = app_state(FixedClient::answering("x"));

    let (status, created) = send_json(&state, Request::post("/threads").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::CREATED);
    let new_id = created["thread_id"].as_str().unwrap().to_string();
    assert_eq!(created["label"], format!("Chat {}...", &new_id[..8]));

    let (status, listed) = send_json(&state, get("/threads")).await;
    assert_eq!(status, StatusCode::OK);

    let threads = listed["threads"].as_array().unwrap();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[1]["thread_id"], new_id);
    assert_eq!(listed["current"], new_id);
}

#[tokio::test]
async fn test_upload_then_ask() {
    let client = FixedClient::answering("The answer is Paris");
    let state = app_state(client.clone());

    let (status, uploaded) =
        send_json(&state, post_bytes("/document", b"The capital of France is Paris.")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(uploaded["characters"], 31);

    let (status, answer) = send_json(
        &state,
        post_json("/messages", json!({ "content": "What is the capital?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answer["answer"], "Paris");
    assert_eq!(answer["fallback"], false);
    assert_eq!(client.calls(), 1);

    let (status, transcript) = send_json(&state, get("/threads/current/messages")).await;
    assert_eq!(status, StatusCode::OK);

    let messages = transcript["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "What is the capital?");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "Paris");
}

#[tokio::test]
async fn test_llm_failure_is_bad_gateway() {
    let client = FixedClient::failing();
    let state = app_state(client.clone());

    let (status, body) = send_json(
        &state,
        post_json("/messages", json!({ "content": "Anything?" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Error generating response:"));
    assert_eq!(client.calls(), 1);

    // The question stays in the transcript, no answer is stored
    let (_, transcript) = send_json(&state, get("/threads/current/messages")).await;
    let messages = transcript["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
}

#[tokio::test]
async fn test_blank_question_rejected() {
    let client = FixedClient::answering("x");
    let state = app_state(client.clone());

    let (status, _) = send_json(&state, post_json("/messages", json!({ "content": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &state,
        post_json("/messages/stream", json!({ "content": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_empty_upload_rejected() {
    let state = app_state(FixedClient::answering("x"));

    let (status, _) = send_json(&state, post_bytes("/document", b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_thread() {
    let state = app_state(FixedClient::answering("x"));

    let (status, body) = send_json(
        &state,
        Request::post("/threads/does-not-exist/select")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("does-not-exist"));

    let (status, _) = send_json(&state, get("/threads/does-not-exist/messages")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_select_thread_switches_transcript() {
    let state = app_state(FixedClient::answering("Yes"));

    let (_, listed) = send_json(&state, get("/threads")).await;
    let first = listed["current"].as_str().unwrap().to_string();

    send_json(&state, post_json("/messages", json!({ "content": "Is it?" }))).await;
    send_json(&state, Request::post("/threads").body(Body::empty()).unwrap()).await;

    let (_, transcript) = send_json(&state, get("/threads/current/messages")).await;
    assert!(transcript["messages"].as_array().unwrap().is_empty());

    let (status, selected) = send_json(
        &state,
        Request::post(format!("/threads/{}/select", first))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(selected["message_count"], 2);

    let (_, transcript) = send_json(&state, get(&format!("/threads/{}/messages", first))).await;
    assert_eq!(transcript["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_busy_session_conflicts() {
    let state = app_state(FixedClient::answering("x"));

    let _turn = state.session.lock().await;

    let (status, body) = send_json(
        &state,
        post_json("/messages", json!({ "content": "Hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already"));

    let (status, _) = send_json(&state, Request::post("/threads").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_stream_emits_fragments_then_answer() {
    let state = app_state(FixedClient::answering("The answer is Paris"));

    let (status, body) = send(
        build_router(state.clone()),
        post_json("/messages/stream", json!({ "content": "What is the capital?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body = String::from_utf8(body).unwrap();
    assert!(body.contains("event: fragment"));
    assert!(body.contains("event: answer"));
    assert!(body.contains(r#""answer":"Paris""#));

    let fragment_at = body.find("event: fragment").unwrap();
    let answer_at = body.find("event: answer").unwrap();
    assert!(fragment_at < answer_at);

    let session = state.session.lock().await;
    assert_eq!(session.transcript().unwrap().len(), 2);
}

#[tokio::test]
async fn test_stream_failure_emits_error_event() {
    let state = app_state(FixedClient::failing());

    let (status, body) = send(
        build_router(state.clone()),
        post_json("/messages/stream", json!({ "content": "Anything?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body = String::from_utf8(body).unwrap();
    assert!(body.contains("event: error"));
    assert!(body.contains("Error generating response"));
    assert!(!body.contains("event: answer"));
}
