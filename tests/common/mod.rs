//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{filter::LevelFilter, fmt::MakeWriter, layer::SubscriberExt, Layer, Registry};

use demo_service::health::ReadinessChecks;
use demo_service::http::{app_routes, build_router, AppState};
use demo_service::observability::sink::{MetricSample, MetricSink, SinkError};
use demo_service::observability::JsonLogLayer;
use demo_service::AppConfig;

/// In-memory log destination shared between the subscriber and the test.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl CapturedLogs {
    /// Every record written so far, parsed. Each line must be one JSON object.
    pub fn records(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).expect("log line is not JSON"))
            .collect()
    }

    /// Records whose message equals `message`.
    pub fn with_message(&self, message: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|r| r["message"] == message)
            .collect()
    }

    /// Records at `level`.
    pub fn at_level(&self, level: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|r| r["level"] == level)
            .collect()
    }
}

/// Install a JSON logger writing into memory for the current thread.
///
/// Tests run on the current-thread runtime, so spawned tasks log through the
/// same subscriber.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber =
        Registry::default().with(JsonLogLayer::new(logs.clone()).with_filter(LevelFilter::DEBUG));
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

/// Sink counting publish calls; optionally failing each one.
#[derive(Clone, Default)]
pub struct CountingSink {
    calls: Arc<AtomicUsize>,
    samples: Arc<Mutex<Vec<MetricSample>>>,
    fail: bool,
}

impl CountingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> Vec<MetricSample> {
        self.samples.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricSink for CountingSink {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn publish(&self, _namespace: &str, samples: &[MetricSample]) -> Result<(), SinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.samples.lock().unwrap().extend_from_slice(samples);
        if self.fail {
            Err(SinkError::Rejected(503))
        } else {
            Ok(())
        }
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        app_name: "test-app".into(),
        environment: "test".into(),
        ..AppConfig::default()
    }
}

/// Fully layered application around the default routes plus `extra`.
pub fn app_with(
    config: AppConfig,
    sink: impl MetricSink + 'static,
    readiness: ReadinessChecks,
    extra: Router<AppState>,
) -> Router {
    let state = AppState::new(config, Arc::new(sink), readiness).unwrap();
    build_router(state, app_routes().merge(extra))
}

pub fn app(config: AppConfig) -> Router {
    app_with(config, CountingSink::default(), ReadinessChecks::new(), Router::new())
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
