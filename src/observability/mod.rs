//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → context.rs (correlation ID, request span)
//!     → logging.rs (JSON records, request fields from the span)
//!     → metrics.rs (counters, histograms, optional push)
//!     → sink.rs (external push target, or no-op)
//!
//! Consumers:
//!     → Log aggregation (stdout, one JSON object per line)
//!     → Metrics endpoint (Prometheus scrape)
//!     → HTTP push endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line via the request span
//! - Metrics state is an explicit object held by the server, not a global
//! - Sink failures degrade to warnings; the response is never affected

pub mod context;
pub mod logging;
pub mod metrics;
pub mod sink;

pub use context::RequestContext;
pub use logging::{utc_timestamp, JsonLogLayer, LogEvent};
pub use metrics::MetricsRecorder;
pub use sink::{MetricSample, MetricSink, NoopSink};
