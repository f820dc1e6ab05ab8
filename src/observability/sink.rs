//! External (push-based) metrics sink.
//!
//! # Responsibilities
//! - Define the `MetricSink` capability the metrics recorder forwards to
//! - Provide the HTTP push client for a JSON metrics ingestion endpoint
//! - Provide a no-op sink used when push export is disabled or unavailable
//!
//! # Design Decisions
//! - Call sites never check availability; they always hold some sink
//! - Construction failure is logged once and degrades to the no-op sink
//! - Samples use `PutMetricData` field names; requests are unsigned, so the
//!   endpoint is a collector or gateway, not the AWS API itself

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::config::AppConfig;

/// Unit of a pushed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricUnit {
    Count,
    Seconds,
    Milliseconds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single metric value with its dimensions. Built and sent within one
/// request's lifecycle, never retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricSample {
    pub metric_name: String,
    pub value: f64,
    pub unit: MetricUnit,
    pub dimensions: Vec<Dimension>,
}

impl MetricSample {
    /// `RequestCount` sample for one completed request.
    pub fn request_count(environment: &str, status: u16, method: &str, endpoint: &str) -> Self {
        Self {
            metric_name: "RequestCount".to_string(),
            value: 1.0,
            unit: MetricUnit::Count,
            dimensions: vec![
                Dimension::new("Environment", environment),
                Dimension::new("StatusCode", status.to_string()),
                Dimension::new("Method", method),
                Dimension::new("Endpoint", endpoint),
            ],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("no push endpoint configured (set CLOUDWATCH_ENDPOINT)")]
    NotConfigured,

    #[error("invalid push endpoint `{0}`: {1}")]
    InvalidEndpoint(String, url::ParseError),

    #[error("failed to build push client: {0}")]
    Client(reqwest::Error),

    #[error("sink unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sink rejected samples with status {0}")]
    Rejected(u16),

    #[error("push timed out after {0:?}")]
    Timeout(Duration),
}

/// Destination for pushed metric samples.
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Publish samples under `namespace`.
    async fn publish(&self, namespace: &str, samples: &[MetricSample]) -> Result<(), SinkError>;
}

/// Sink that accepts and discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl MetricSink for NoopSink {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn publish(&self, _namespace: &str, _samples: &[MetricSample]) -> Result<(), SinkError> {
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutMetricData<'a> {
    namespace: &'a str,
    region: &'a str,
    metric_data: &'a [MetricSample],
}

/// Pushes samples as JSON to an HTTP ingestion endpoint.
#[derive(Debug, Clone)]
pub struct HttpMetricSink {
    client: reqwest::Client,
    endpoint: Url,
    region: String,
}

impl HttpMetricSink {
    pub fn new(endpoint: &str, region: &str, timeout: Duration) -> Result<Self, SinkError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SinkError::InvalidEndpoint(endpoint.to_string(), e))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SinkError::Client)?;

        Ok(Self {
            client,
            endpoint,
            region: region.to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, SinkError> {
        let endpoint = config
            .cloudwatch_endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(SinkError::NotConfigured)?;
        Self::new(
            endpoint,
            &config.aws_region,
            Duration::from_millis(config.metrics_push_timeout_ms),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl MetricSink for HttpMetricSink {
    fn name(&self) -> &'static str {
        "http-push"
    }

    async fn publish(&self, namespace: &str, samples: &[MetricSample]) -> Result<(), SinkError> {
        let body = PutMetricData {
            namespace,
            region: &self.region,
            metric_data: samples,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

/// Sink selected by configuration. Falls back to `NoopSink`, logging the
/// reason once, when push export is enabled but the client cannot be built.
pub fn from_config(config: &AppConfig) -> Arc<dyn MetricSink> {
    if !config.enable_cloudwatch {
        return Arc::new(NoopSink);
    }

    match HttpMetricSink::from_config(config) {
        Ok(sink) => {
            tracing::info!(
                endpoint = %sink.endpoint(),
                region = %config.aws_region,
                "External metrics push enabled"
            );
            Arc::new(sink)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Metrics push client unavailable, external metrics disabled"
            );
            Arc::new(NoopSink)
        }
    }
}
