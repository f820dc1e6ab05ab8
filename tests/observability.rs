//! Request-path observability: correlation IDs, access logs, faults, metrics.

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing,
    Router,
};
use futures_util::future::join_all;
use serde_json::json;

use demo_service::health::{CheckStatus, ReadinessCheck, ReadinessChecks};
use demo_service::http::{AppError, AppState};
use demo_service::observability::sink::HttpMetricSink;
use demo_service::AppConfig;

mod common;
use common::{app, app_with, capture_logs, get, json_body, send, test_config, text_body, CountingSink};

#[derive(Debug, thiserror::Error)]
#[error("ledger backend offline")]
struct LedgerOffline;

async fn failing_handler() -> Result<&'static str, AppError> {
    Err(AppError::from(LedgerOffline))
}

async fn panicking_handler() -> &'static str {
    panic!("invariant broken")
}

fn fault_routes() -> Router<AppState> {
    Router::new()
        .route("/api/fail", routing::get(failing_handler))
        .route("/api/panic", routing::get(panicking_handler))
}

/// Access summaries are the records carrying a `status_code` field.
fn summaries(records: &[serde_json::Value]) -> Vec<&serde_json::Value> {
    records.iter().filter(|r| r.get("status_code").is_some()).collect()
}

#[tokio::test]
async fn test_supplied_request_id_is_propagated() {
    let (logs, _guard) = capture_logs();
    let app = app(test_config());

    let request = Request::builder()
        .uri("/api/hello?name=Alice")
        .header("X-Request-ID", "abc-123")
        .header("User-Agent", "kube-probe/1.29")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "abc-123");
    let raw = text_body(response).await;
    let body: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(body["message"], "Hello, Alice!");

    let records = logs.records();
    let summaries = summaries(&records);
    assert_eq!(summaries.len(), 1);
    let summary = summaries[0];
    assert_eq!(summary["level"], "INFO");
    assert_eq!(summary["request_id"], "abc-123");
    assert_eq!(summary["request"]["method"], "GET");
    assert_eq!(summary["request"]["path"], "/api/hello");
    assert_eq!(summary["status_code"], 200);
    assert_eq!(summary["user_agent"], "kube-probe/1.29");
    assert_eq!(summary["content_length"], raw.len() as u64);
    assert!(summary["elapsed_ms"].is_u64());
}

#[tokio::test]
async fn test_summary_keys_without_user_agent() {
    let (logs, _guard) = capture_logs();
    let app = app(test_config());

    send(&app, get("/api/info")).await;

    let records = logs.records();
    let summaries = summaries(&records);
    assert_eq!(summaries.len(), 1);
    let summary = summaries[0].as_object().unwrap();
    assert!(summary["user_agent"].is_null());
    assert!(summary.contains_key("content_length"));
}

#[tokio::test]
async fn test_preflight_is_observed() {
    let (logs, _guard) = capture_logs();
    let app = app(test_config());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/hello")
        .header("Origin", "https://example.org")
        .header("Access-Control-Request-Method", "GET")
        .header("X-Request-ID", "pre-1")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "pre-1");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let records = logs.records();
    let summaries = summaries(&records);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["request_id"], "pre-1");
    assert_eq!(summaries[0]["method"], "OPTIONS");

    let text = text_body(send(&app, get("/metrics")).await).await;
    assert!(text
        .lines()
        .any(|l| l.starts_with("http_requests_total{") && l.contains(r#"method="OPTIONS""#)));
}

#[tokio::test]
async fn test_blank_request_id_is_replaced() {
    let (_logs, _guard) = capture_logs();
    let app = app(test_config());

    let request = Request::builder()
        .uri("/api/info")
        .header("X-Request-ID", "   ")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_generated_request_ids_are_unique() {
    let (_logs, _guard) = capture_logs();
    let app = app(test_config());

    let responses = join_all((0..50).map(|_| send(&app, get("/api/info")))).await;

    let mut ids: Vec<String> = responses
        .iter()
        .map(|r| r.headers()["x-request-id"].to_str().unwrap().to_string())
        .collect();
    for id in &ids {
        assert!(uuid::Uuid::parse_str(id).is_ok(), "not a UUID: {id}");
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 50);
}

#[tokio::test]
async fn test_probes_are_not_access_logged() {
    let (logs, _guard) = capture_logs();
    let app = app(test_config());

    for path in ["/health", "/health/ready", "/health/live"] {
        let response = send(&app, get(path)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert!(summaries(&logs.records()).is_empty());

    send(&app, get("/")).await;
    assert_eq!(summaries(&logs.records()).len(), 1);
}

#[tokio::test]
async fn test_health_body() {
    let (_logs, _guard) = capture_logs();
    let response = send(&app(test_config()), get("/health")).await;

    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "test-app");
    assert_eq!(body["environment"], "test");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_liveness_is_idempotent() {
    let (_logs, _guard) = capture_logs();
    let app = app(test_config());

    for _ in 0..3 {
        let response = send(&app, get("/health/live")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "alive");
    }
}

struct Database(bool);

#[async_trait]
impl ReadinessCheck for Database {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> CheckStatus {
        self.0.into()
    }
}

#[tokio::test]
async fn test_readiness_reflects_checks() {
    let (_logs, _guard) = capture_logs();

    let ready = app_with(
        test_config(),
        CountingSink::default(),
        ReadinessChecks::new().with(Database(true)),
        Router::new(),
    );
    let response = send(&ready, get("/health/ready")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["database"], "ok");

    let not_ready = app_with(
        test_config(),
        CountingSink::default(),
        ReadinessChecks::new().with(Database(false)),
        Router::new(),
    );
    let response = send(&not_ready, get("/health/ready")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["checks"]["database"], "failed");
}

#[tokio::test]
async fn test_fault_returns_uniform_body_and_logs_once() {
    let (logs, _guard) = capture_logs();
    let app = app_with(
        test_config(),
        CountingSink::default(),
        ReadinessChecks::new(),
        fault_routes(),
    );

    let request = Request::builder()
        .uri("/api/fail")
        .header("X-Request-ID", "fault-1")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["x-request-id"], "fault-1");
    let body = json_body(response).await;
    assert_eq!(
        body,
        json!({"error": "Internal server error", "request_id": "fault-1"})
    );

    let errors = logs.at_level("ERROR");
    assert_eq!(errors.len(), 1);
    let error = &errors[0];
    assert_eq!(error["request_id"], "fault-1");
    assert!(error["error_type"].as_str().unwrap().contains("LedgerOffline"));
    assert!(error["exception"].as_str().unwrap().contains("ledger backend offline"));
    assert_eq!(
        error["message"],
        "Unhandled exception: ledger backend offline"
    );

    let records = logs.records();
    let summaries = summaries(&records);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["status_code"], 500);
}

#[tokio::test]
async fn test_panic_is_handled_as_fault() {
    let (logs, _guard) = capture_logs();
    let app = app_with(
        test_config(),
        CountingSink::default(),
        ReadinessChecks::new(),
        fault_routes(),
    );

    let response = send(&app, get("/api/panic")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    let body = json_body(response).await;
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["request_id"], id.as_str());

    let errors = logs.at_level("ERROR");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["error_type"], "panic");
    assert_eq!(errors[0]["message"], "Unhandled exception: invariant broken");
}

#[tokio::test]
async fn test_protocol_errors_are_not_faults() {
    let (logs, _guard) = capture_logs();
    let app = app(test_config());

    let response = send(&app, get("/does/not/exist")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key("x-request-id"));

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/echo")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&app, malformed).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(logs.at_level("ERROR").is_empty());
    let records = logs.records();
    let statuses: Vec<_> = summaries(&records)
        .iter()
        .map(|r| r["status_code"].as_u64().unwrap())
        .collect();
    assert_eq!(statuses, vec![404, 400]);
}

#[tokio::test]
async fn test_echo_returns_payload() {
    let (_logs, _guard) = capture_logs();
    let app = app(test_config());

    let request = Request::builder()
        .method("POST")
        .uri("/api/echo")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"a":1}"#))
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["echo"], json!({"a": 1}));
    assert_eq!(body["content_type"], "application/json");
}

#[tokio::test]
async fn test_metrics_endpoint_counts_requests() {
    let (_logs, _guard) = capture_logs();
    let sink = CountingSink::default();
    let app = app_with(test_config(), sink.clone(), ReadinessChecks::new(), Router::new());

    send(&app, get("/api/hello")).await;
    send(&app, get("/api/hello")).await;
    send(&app, get("/health")).await;
    send(&app, get("/nowhere")).await;

    let response = send(&app, get("/metrics")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let text = text_body(response).await;
    assert!(text.contains("http_requests_total"));
    assert!(text.contains(r#"endpoint="/api/hello""#));
    assert!(text.contains(r#"endpoint="unknown""#));
    assert!(text.contains("app_info"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    // /health and /metrics are never pushed.
    assert_eq!(sink.calls(), 3);
    let mut endpoints: Vec<_> = sink
        .samples()
        .iter()
        .map(|s| s.dimensions[3].value.clone())
        .collect();
    endpoints.sort();
    assert_eq!(endpoints, vec!["/api/hello", "/api/hello", "unknown"]);
}

#[tokio::test]
async fn test_metrics_disabled() {
    let (_logs, _guard) = capture_logs();
    let sink = CountingSink::default();
    let config = AppConfig {
        enable_metrics: false,
        ..test_config()
    };
    let app = app_with(config, sink.clone(), ReadinessChecks::new(), Router::new());

    assert_eq!(send(&app, get("/api/hello")).await.status(), StatusCode::OK);
    assert_eq!(send(&app, get("/metrics")).await.status(), StatusCode::NOT_FOUND);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.calls(), 0);
}

#[tokio::test]
async fn test_failing_sink_does_not_affect_response() {
    let (logs, _guard) = capture_logs();
    let sink = CountingSink::failing();
    let app = app_with(test_config(), sink.clone(), ReadinessChecks::new(), Router::new());

    let request = Request::builder()
        .uri("/api/info")
        .header("X-Request-ID", "push-1")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.calls(), 1);
    let warnings = logs.with_message("Failed to push metrics to external sink");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["level"], "WARNING");
    assert_eq!(warnings[0]["request_id"], "push-1");
}

#[tokio::test]
async fn test_unreachable_push_endpoint() {
    let (logs, _guard) = capture_logs();
    let sink = HttpMetricSink::new("http://127.0.0.1:9/", "us-east-1", Duration::from_millis(500))
        .unwrap();
    let config = AppConfig {
        enable_cloudwatch: true,
        metrics_push_timeout_ms: 1_000,
        ..test_config()
    };
    let app = app_with(config, sink, ReadinessChecks::new(), Router::new());

    let response = send(&app, get("/api/hello")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut warnings = Vec::new();
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        warnings = logs.with_message("Failed to push metrics to external sink");
        if !warnings.is_empty() {
            break;
        }
    }
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["sink"], "http-push");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let (logs, _guard) = capture_logs();
    let config = AppConfig {
        max_body_bytes: 16,
        ..test_config()
    };
    let app = app(config);

    let request = Request::builder()
        .method("POST")
        .uri("/api/echo")
        .header("content-type", "application/json")
        .body(Body::from(format!(r#"{{"data":"{}"}}"#, "x".repeat(64))))
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(logs.at_level("ERROR").is_empty());
}
