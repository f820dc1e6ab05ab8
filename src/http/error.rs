//! Handler error type.
//!
//! Handlers return `Result<_, AppError>`. Two outcomes are distinguished:
//!
//! - `AppError::Status` is an intended protocol response (404, 403, 400...)
//!   and is rendered as-is.
//! - `AppError::Fault` is an unanticipated application failure. It renders as
//!   a bare 500 carrying the `Fault` in its extensions; the fault middleware is
//!   the only place that logs it and writes the client-facing body.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Details of an application fault, captured where it was raised.
#[derive(Debug, Clone)]
pub struct Fault {
    /// Type name of the original error.
    pub type_name: String,
    /// Top-level error message.
    pub message: String,
    /// Full error chain (and backtrace when enabled).
    pub trace: String,
}

impl Fault {
    /// Capture `err` as a fault.
    ///
    /// `type_name` is the static type converted here. Errors already wrapped
    /// in `anyhow::Error` (via `anyhow!` or `Context`) report `anyhow::Error`;
    /// their original type survives only in `message` and `trace`.
    pub fn from_error<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        let type_name = std::any::type_name::<E>().to_string();
        let err: anyhow::Error = err.into();
        Self {
            type_name,
            message: err.to_string(),
            trace: format!("{err:?}"),
        }
    }

    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self {
            type_name: "panic".to_string(),
            trace: format!("panicked: {message}"),
            message,
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Status(StatusCode),
    Fault(Fault),
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::Fault(Fault::from_error(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Status(status) => status.into_response(),
            AppError::Fault(fault) => {
                let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                response.extensions_mut().insert(fault);
                response
            }
        }
    }
}

/// The uniform body for every internal fault. Never contains error details.
pub fn internal_error_response(request_id: Option<&str>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal server error",
            "request_id": request_id,
        })),
    )
        .into_response()
}
