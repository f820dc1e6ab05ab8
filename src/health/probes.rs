//! Orchestrator probe handlers.

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::health::checks::CheckStatus;
use crate::http::server::AppState;
use crate::observability::utc_timestamp;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: String,
    pub service: String,
    pub version: String,
    pub environment: String,
}

#[derive(Debug, Serialize)]
pub struct ReadinessStatus {
    pub status: &'static str,
    pub checks: BTreeMap<String, CheckStatus>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct LivenessStatus {
    pub status: &'static str,
    pub timestamp: String,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        timestamp: utc_timestamp(),
        service: state.config.app_name.clone(),
        version: state.config.app_version.clone(),
        environment: state.config.environment.clone(),
    })
}

/// `GET /health/ready`: 200 when every check passes, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessStatus>) {
    let report = state.readiness.run().await;
    let (code, status) = if report.ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        code,
        Json(ReadinessStatus {
            status,
            checks: report.checks,
            timestamp: utc_timestamp(),
        }),
    )
}

/// `GET /health/live`: answers as long as the process can serve requests.
pub async fn live() -> Json<LivenessStatus> {
    Json(LivenessStatus {
        status: "alive",
        timestamp: utc_timestamp(),
    })
}
