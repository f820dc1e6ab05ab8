//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count requests by method, endpoint and status
//! - Expose a Prometheus-compatible snapshot at `/metrics`
//! - Forward per-request samples to the external sink without delaying the response
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, endpoint, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `app_info` (gauge): constant 1, labelled with version and environment
//!
//! # Design Decisions
//! - The recorder is owned by the server state, not installed globally
//! - Low-overhead metric updates (atomic operations inside the exporter)
//! - Sink pushes run on a spawned task with a bounded timeout; failures are
//!   logged at WARNING and never reach the caller

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::observability::sink::{MetricSample, MetricSink, SinkError};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const APP_INFO: &str = "app_info";

/// Path serving the pull-based snapshot.
pub const METRICS_PATH: &str = "/metrics";

/// How often buffered histogram samples are drained.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Endpoint label for requests that matched no route.
pub const UNKNOWN_ENDPOINT: &str = "unknown";

/// Histogram buckets tuned for typical web latencies (seconds).
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to build metrics recorder: {0}")]
    Build(#[from] BuildError),
}

/// Request metrics plus the optional push path.
pub struct MetricsRecorder {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    sink: Arc<dyn MetricSink>,
    namespace: String,
    environment: String,
    push_timeout: Duration,
}

impl MetricsRecorder {
    pub fn new(config: &AppConfig, sink: Arc<dyn MetricSink>) -> Result<Self, MetricsError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), LATENCY_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_counter!(REQUESTS_TOTAL, "Total HTTP requests by method, endpoint and status");
            describe_histogram!(
                REQUEST_DURATION,
                metrics::Unit::Seconds,
                "HTTP request latency in seconds"
            );
            gauge!(
                APP_INFO,
                "version" => config.app_version.clone(),
                "environment" => config.environment.clone()
            )
            .set(1.0);
        });

        tracing::info!(
            prometheus_enabled = true,
            cloudwatch_enabled = config.enable_cloudwatch,
            sink = sink.name(),
            "Metrics configured"
        );

        Ok(Self {
            recorder,
            handle,
            sink,
            namespace: config.metrics_namespace(),
            environment: config.environment.clone(),
            push_timeout: Duration::from_millis(config.metrics_push_timeout_ms),
        })
    }

    /// Record one completed request.
    pub fn record(&self, method: &str, endpoint: &str, status: u16, elapsed_secs: f64) {
        metrics::with_local_recorder(&self.recorder, || {
            let labels = [
                ("method", method.to_string()),
                ("endpoint", endpoint.to_string()),
                ("status", status.to_string()),
            ];
            counter!(REQUESTS_TOTAL, &labels).increment(1);
            histogram!(REQUEST_DURATION, &labels).record(elapsed_secs);
        });
    }

    /// Push a `RequestCount` sample to the external sink in the background.
    ///
    /// Returns immediately. The push inherits the current span so its
    /// failure warning carries the request ID.
    pub fn forward(&self, method: &str, endpoint: &str, status: u16) {
        let sample = MetricSample::request_count(&self.environment, status, method, endpoint);
        let sink = Arc::clone(&self.sink);
        let namespace = self.namespace.clone();
        let timeout = self.push_timeout;

        let push = async move {
            let result = match tokio::time::timeout(
                timeout,
                sink.publish(&namespace, std::slice::from_ref(&sample)),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(SinkError::Timeout(timeout)),
            };

            if let Err(e) = result {
                tracing::warn!(
                    error = %e,
                    sink = sink.name(),
                    namespace = %namespace,
                    "Failed to push metrics to external sink"
                );
            }
        };
        tokio::spawn(push.instrument(tracing::Span::current()));
    }

    /// Prometheus exposition text of every metric.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Drain buffered histogram samples into their buckets.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }

    /// Run upkeep every `period` until the shutdown signal arrives.
    ///
    /// Without it, histogram samples are only drained by a scrape, so an
    /// unscraped instance would buffer every request's latency.
    pub fn spawn_upkeep(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.run_upkeep(),
                    _ = shutdown.recv() => break,
                }
            }
            tracing::debug!("Metrics upkeep stopped");
        })
    }
}

/// Whether a completed request is forwarded to the external sink. Probe and
/// scrape traffic is excluded to keep push volume down.
pub fn should_forward(path: &str) -> bool {
    !path.starts_with(crate::health::HEALTH_PREFIX) && path != METRICS_PATH
}
