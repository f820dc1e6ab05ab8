//! Demonstration API.
//!
//! Static JSON routes wrapped by the observability middleware. They carry no
//! state of their own beyond the shared configuration.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::http::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/hello", get(handlers::hello))
        .route("/api/info", get(handlers::info))
        .route("/api/echo", post(handlers::echo))
}
