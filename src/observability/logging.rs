//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the process-wide `tracing` subscriber once at startup
//! - Render every event as a single-line JSON record
//! - Attach request context when the event happens inside a request span
//! - Drop events below the configured minimum level before rendering
//!
//! # Record Schema
//! ```text
//! timestamp   UTC, ISO-8601, microseconds, trailing `Z`
//! level       DEBUG | INFO | WARNING | ERROR
//! logger      event target
//! message     formatted message
//! module, file, line
//! request_id  only inside a request span
//! request     {method, path, remote_addr}, only inside a request span
//! exception   fault trace, when the event records an `exception` field
//! <extra>     every other event field, merged at the top level; declared
//!             fields left without a value are null
//! ```

use std::fmt;
use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{span, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::MakeWriter,
    layer::{Context, Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{AppConfig, LogLevel};
use crate::observability::context::REQUEST_SPAN;

/// Crates whose internal chatter is clamped regardless of the configured level.
const QUIET_TARGETS: &str = "hyper=warn,hyper_util=warn,h2=warn,reqwest=warn";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("a global logger is already installed")]
    AlreadyInitialized,
}

/// Install the JSON logger on stdout as the global subscriber.
pub fn init(config: &AppConfig) -> Result<(), LoggingError> {
    let level = config.effective_log_level();
    let filter = EnvFilter::try_new(format!("{},{}", level.as_filter(), QUIET_TARGETS))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(JsonLogLayer::stdout())
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    tracing::info!(
        log_level = %level,
        environment = %config.environment,
        "Logging configured"
    );
    Ok(())
}

/// Current time in the format used across logs and response bodies.
pub fn utc_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Request fields attached to events emitted inside a request span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestSummary {
    pub method: String,
    pub path: String,
    pub remote_addr: String,
}

/// One rendered log record.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub timestamp: String,
    pub level: LogLevel,
    pub logger: String,
    pub message: String,
    pub module: String,
    pub file: String,
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(skip)]
    pub extra: Map<String, Value>,
}

impl LogEvent {
    /// Record as a JSON object. Extra fields override the built-in keys.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, value) in &self.extra {
            record.insert(key.clone(), value.clone());
        }
        record
    }

    /// Newline-terminated JSON line.
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = serde_json::to_vec(&Value::Object(self.to_record())).unwrap_or_default();
        line.push(b'\n');
        line
    }
}

fn level_of(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warning,
        Level::INFO => LogLevel::Info,
        _ => LogLevel::Debug,
    }
}

/// Request fields captured from the request span when it opens.
#[derive(Debug, Clone)]
struct RequestScope {
    request_id: Option<String>,
    summary: RequestSummary,
}

impl RequestScope {
    fn from_fields(mut fields: Map<String, Value>) -> Self {
        let mut take = |name: &str| fields.remove(name).map(into_text);
        Self {
            request_id: take("request_id"),
            summary: RequestSummary {
                method: take("method").unwrap_or_default(),
                path: take("path").unwrap_or_default(),
                remote_addr: take("remote_addr").unwrap_or_default(),
            },
        }
    }
}

fn into_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    exception: Option<String>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        match field.name() {
            "message" => self.message = Some(into_text(value)),
            "exception" => self.exception = Some(into_text(value)),
            name => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}

/// `tracing` layer writing one JSON object per event.
///
/// Each record is serialized in memory and handed to the writer in a single
/// `write_all`, so lines from concurrent requests never interleave. Write
/// failures are ignored.
pub struct JsonLogLayer<W> {
    make_writer: W,
}

impl JsonLogLayer<fn() -> io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            make_writer: io::stdout,
        }
    }
}

impl<W> JsonLogLayer<W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    pub fn new(make_writer: W) -> Self {
        Self { make_writer }
    }
}

impl<S, W> Layer<S> for JsonLogLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if attrs.metadata().name() != REQUEST_SPAN {
            return;
        }
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        span.extensions_mut()
            .insert(RequestScope::from_fields(visitor.fields));
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        // Declared fields without a value (a `None` option) render as null.
        for field in metadata.fields() {
            let name = field.name();
            if name != "message" && name != "exception" && !visitor.fields.contains_key(name) {
                visitor.fields.insert(name.to_string(), Value::Null);
            }
        }

        let scope = ctx.event_scope(event).and_then(|mut spans| {
            spans.find_map(|span| span.extensions().get::<RequestScope>().cloned())
        });
        let (request_id, request) = match scope {
            Some(scope) => (scope.request_id, Some(scope.summary)),
            None => (None, None),
        };

        let record = LogEvent {
            timestamp: utc_timestamp(),
            level: level_of(metadata.level()),
            logger: metadata.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            module: metadata.module_path().unwrap_or_default().to_string(),
            file: metadata.file().unwrap_or_default().to_string(),
            line: metadata.line(),
            request_id,
            request,
            exception: visitor.exception,
            extra: visitor.fields,
        };

        let mut writer = self.make_writer.make_writer_for(metadata);
        let _ = writer.write_all(&record.to_line());
    }
}
