use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::middleware::request_id::RequestId;

/// One log line per request, at a level chosen by the response status
pub async fn request_logger_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    if status >= 500 {
        tracing::error!(%method, %path, status, latency_ms, %request_id, "request failed");
    } else if status >= 400 {
        tracing::warn!(%method, %path, status, latency_ms, %request_id, "request rejected");
    } else {
        tracing::info!(%method, %path, status, latency_ms, %request_id, "request completed");
    }
    response
}
