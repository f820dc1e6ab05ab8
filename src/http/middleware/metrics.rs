//! Request metrics middleware.
//!
//! Only installed when metrics are enabled. Records every response under the
//! matched route template and forwards non-probe traffic to the push sink.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::observability::metrics::{should_forward, MetricsRecorder, UNKNOWN_ENDPOINT};

pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRecorder>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_ENDPOINT.to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16();
    metrics.record(&method, &endpoint, status, started.elapsed().as_secs_f64());
    if should_forward(&path) {
        metrics.forward(&method, &endpoint, status);
    }

    response
}
