//! Demonstration API handlers.

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::error::AppError;
use crate::http::server::AppState;
use crate::observability::utc_timestamp;

#[derive(Debug, Serialize)]
pub struct ServiceIndex {
    pub service: String,
    pub version: String,
    pub environment: String,
    pub status: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// `GET /`
pub async fn index(State(state): State<AppState>) -> Json<ServiceIndex> {
    Json(ServiceIndex {
        service: state.config.app_name.clone(),
        version: state.config.app_version.clone(),
        environment: state.config.environment.clone(),
        status: "running",
        endpoints: BTreeMap::from([
            ("health", "/health"),
            ("ready", "/health/ready"),
            ("live", "/health/live"),
            ("metrics", "/metrics"),
            ("api", "/api"),
        ]),
    })
}

#[derive(Debug, Deserialize)]
pub struct HelloQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Greeting {
    pub message: String,
    pub timestamp: String,
    pub service: String,
    pub version: String,
    pub environment: String,
    pub hostname: String,
}

/// `GET /api/hello?name=`
pub async fn hello(State(state): State<AppState>, Query(query): Query<HelloQuery>) -> Json<Greeting> {
    let name = query.name.unwrap_or_else(|| "World".to_string());
    Json(Greeting {
        message: format!("Hello, {name}!"),
        timestamp: utc_timestamp(),
        service: state.config.app_name.clone(),
        version: state.config.app_version.clone(),
        environment: state.config.environment.clone(),
        hostname: state.hostname.to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: ServiceIdentity,
    pub platform: Platform,
    pub features: Features,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceIdentity {
    pub name: String,
    pub version: String,
    pub environment: String,
}

#[derive(Debug, Serialize)]
pub struct Platform {
    pub hostname: String,
    pub region: String,
}

#[derive(Debug, Serialize)]
pub struct Features {
    pub metrics_enabled: bool,
    pub cloudwatch_enabled: bool,
}

/// `GET /api/info`
pub async fn info(State(state): State<AppState>) -> Json<ServiceInfo> {
    let config = &state.config;
    Json(ServiceInfo {
        service: ServiceIdentity {
            name: config.app_name.clone(),
            version: config.app_version.clone(),
            environment: config.environment.clone(),
        },
        platform: Platform {
            hostname: state.hostname.to_string(),
            region: config.aws_region.clone(),
        },
        features: Features {
            metrics_enabled: config.enable_metrics,
            cloudwatch_enabled: config.enable_cloudwatch,
        },
        timestamp: utc_timestamp(),
    })
}

#[derive(Debug, Serialize)]
pub struct Echo {
    pub echo: Value,
    pub timestamp: String,
    pub content_type: Option<String>,
}

/// `POST /api/echo`: returns the posted JSON. An empty or falsy payload
/// echoes `{}`; a body that is not JSON is a 400.
pub async fn echo(headers: HeaderMap, body: Bytes) -> Result<Json<Echo>, AppError> {
    let payload = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|_| AppError::Status(StatusCode::BAD_REQUEST))?
    };

    Ok(Json(Echo {
        echo: if is_falsy(&payload) {
            Value::Object(Map::new())
        } else {
            payload
        },
        timestamp: utc_timestamp(),
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    }))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
