//! Exception interceptor.
//!
//! Innermost middleware: sees the handler's raw outcome before any other
//! layer. Faults (returned `AppError::Fault` or a panic) are logged once at
//! ERROR and replaced by the uniform 500 body. Every other response,
//! including 404/403/405 produced by routing, passes through untouched.

use std::panic::AssertUnwindSafe;

use axum::{extract::Request, middleware::Next, response::Response};
use futures_util::FutureExt;

use crate::http::error::{internal_error_response, Fault};
use crate::observability::RequestContext;

pub async fn fault_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone());

    let fault = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(mut response) => match response.extensions_mut().remove::<Fault>() {
            Some(fault) => fault,
            None => return response,
        },
        Err(payload) => Fault::from_panic(payload),
    };

    tracing::error!(
        error_type = %fault.type_name,
        exception = %fault.trace,
        "Unhandled exception: {}",
        fault.message
    );

    internal_error_response(request_id.as_deref())
}
