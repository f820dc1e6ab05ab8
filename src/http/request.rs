//! Request identification.
//!
//! # Responsibilities
//! - Assign a correlation ID to every request before any handler sees it
//! - Build the `RequestContext` and store it in the request extensions
//! - Open the request span so every log line carries the ID
//! - Echo the ID back in the `X-Request-ID` response header
//!
//! # Design Decisions
//! - Caller supplied IDs are trusted verbatim; empty ones are replaced
//! - This is the outermost application middleware, so even protocol
//!   errors produced further in are logged with the ID

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use crate::observability::context::{correlation_id, RequestContext, X_REQUEST_ID};

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = correlation_id(request.headers());
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());

    let ctx = RequestContext::new(
        request_id.clone(),
        request.method().clone(),
        request.uri().path().to_string(),
        remote_addr,
    );
    let span = ctx.span();

    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &header {
        request.headers_mut().insert(X_REQUEST_ID, value.clone());
    }
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}
