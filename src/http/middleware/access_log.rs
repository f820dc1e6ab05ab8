//! Request/response logging.
//!
//! Emits one INFO summary per completed request, after the fault interceptor
//! and protocol layers have settled the final status. Probe traffic under
//! `/health` is not logged.

use axum::{
    body::HttpBody,
    extract::Request,
    http::header::{CONTENT_LENGTH, USER_AGENT},
    middleware::Next,
    response::Response,
};

use crate::health::HEALTH_PREFIX;
use crate::observability::RequestContext;

pub async fn access_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let ctx = request.extensions().get::<RequestContext>().cloned();

    let response = next.run(request).await;

    if path.starts_with(HEALTH_PREFIX) {
        return response;
    }

    let status = response.status().as_u16();
    let content_length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .or_else(|| response.body().size_hint().exact());
    let elapsed_ms = ctx.as_ref().map(|c| c.elapsed_ms() as u64);

    tracing::info!(
        method = %method,
        path = %path,
        status_code = status,
        user_agent = user_agent.as_deref(),
        content_length,
        elapsed_ms,
        "{} {} {}",
        method,
        path,
        status
    );

    response
}
