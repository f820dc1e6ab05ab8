//! Per-request context.
//!
//! A `RequestContext` is created by the request ID middleware before any
//! handler runs, stored in the request extensions, and dropped with the
//! request. It is never shared between requests.

use std::time::Instant;

use axum::http::{HeaderMap, Method};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Name of the span that scopes every request. The JSON log layer looks for
/// it to attach request fields to events.
pub const REQUEST_SPAN: &str = "request";

/// Request header carrying a caller supplied correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Identity and timing of one in-flight request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    pub remote_addr: String,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl RequestContext {
    pub fn new(request_id: String, method: Method, path: String, remote_addr: String) -> Self {
        Self {
            request_id,
            method,
            path,
            remote_addr,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Span every event emitted while serving this request is nested in.
    ///
    /// Created at ERROR level so it stays enabled under any minimum level.
    pub fn span(&self) -> tracing::Span {
        tracing::error_span!(
            REQUEST_SPAN,
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            remote_addr = %self.remote_addr,
        )
    }
}

/// Correlation ID for a request: the caller's `X-Request-ID` when present and
/// non-empty, otherwise a fresh UUID v4.
pub fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}
