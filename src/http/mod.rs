//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer ordering)
//!     → request.rs (correlation ID, request span)
//!     → middleware/ (access log, metrics, timeout, faults)
//!     → handler (health probes, demo API, /metrics)
//!     → error.rs (AppError → protocol response or fault)
//!     → Send to client
//! ```

pub mod error;
pub mod middleware;
pub mod request;
pub mod server;

pub use error::{AppError, Fault};
pub use request::request_id_middleware;
pub use server::{app_routes, build_router, AppState, HttpServer, ServerError};
