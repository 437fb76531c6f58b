use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Request logging middleware
///
/// Server errors log at `error`, client errors at `warn`. Health checks
/// only show up at `debug`.
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(%method, %path, %status, duration_ms, "Request failed");
    } else if status.is_client_error() {
        tracing::warn!(%method, %path, %status, duration_ms, "Request rejected");
    } else if path == "/health" {
        tracing::debug!(%method, %path, %status, duration_ms, "Health check");
    } else {
        tracing::info!(%method, %path, %status, duration_ms, "Request processed");
    }

    response
}
