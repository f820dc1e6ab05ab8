//! Health probe subsystem.
//!
//! # Endpoints
//! ```text
//! GET /health        basic status + service metadata
//! GET /health/ready  readiness: runs checks.rs, 503 when any fails
//! GET /health/live   liveness: always 200 while the process responds
//! ```
//!
//! # Design Decisions
//! - Probes are stateless; repeated calls observe no mutation
//! - Readiness dependencies are registered at startup, not hardcoded
//! - Everything under `/health` is excluded from access logs and pushed metrics

pub mod checks;
pub mod probes;

use axum::{routing::get, Router};

use crate::http::server::AppState;

pub use checks::{CheckStatus, ReadinessCheck, ReadinessChecks, ReadinessReport};

/// Path prefix shared by every probe endpoint.
pub const HEALTH_PREFIX: &str = "/health";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(probes::health))
        .route("/health/ready", get(probes::ready))
        .route("/health/live", get(probes::live))
}
