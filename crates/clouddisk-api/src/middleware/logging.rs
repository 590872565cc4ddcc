//! Request/response logging middleware.

use std::time::Instant;

use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, info, warn};

/// Severity a finished request is logged at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Info,
    Warn,
    Error,
}

/// Client errors are expected catalog outcomes (404, 409) and log at warn;
/// server errors mean a compensation or I/O step failed.
fn severity_for(status: StatusCode) -> Severity {
    if status.is_server_error() {
        Severity::Error
    } else if status.is_client_error() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Logs request method, path, status, body size, and duration.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status();
    // Streamed downloads carry their length; JSON bodies may not.
    let bytes = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match severity_for(status) {
        Severity::Info => info!(
            %method, %path, status = status.as_u16(), ?bytes, duration_ms,
            "HTTP request"
        ),
        Severity::Warn => warn!(
            %method, %path, status = status.as_u16(), ?bytes, duration_ms,
            "HTTP request rejected"
        ),
        Severity::Error => error!(
            %method, %path, status = status.as_u16(), ?bytes, duration_ms,
            "HTTP request failed"
        ),
    }

    response
}
