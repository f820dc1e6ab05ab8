//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits so the same schema deserializes from a TOML
//! file, from environment variables, or from both layered together.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing_subscriber::filter::LevelFilter;

/// Root configuration for the service.
///
/// Loaded once at startup and never mutated afterwards; subsystems share it
/// through an `Arc`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Service name reported by probes and used in the metrics namespace.
    pub app_name: String,

    /// Version string reported by probes.
    pub app_version: String,

    /// Deployment environment name (dev, staging, prod, ...).
    pub environment: String,

    /// Minimum log level. When unset the environment profile decides.
    pub log_level: Option<LogLevel>,

    /// Enable local request counters and the `/metrics` endpoint.
    #[serde(deserialize_with = "deserialize_flag")]
    pub enable_metrics: bool,

    /// Enable push of per-request samples to the external metrics sink.
    #[serde(deserialize_with = "deserialize_flag")]
    pub enable_cloudwatch: bool,

    /// Push endpoint of the external metrics sink.
    pub cloudwatch_endpoint: Option<String>,

    /// Upper bound for a single push to the external sink.
    pub metrics_push_timeout_ms: u64,

    /// Cloud region, reported by `/api/info` and attached to pushed samples.
    pub aws_region: String,

    /// Allowed CORS origins: `*` or a comma separated list.
    pub cors_origins: String,

    /// Application secret. Mandatory in production.
    pub secret_key: Option<String>,

    /// Listening port.
    pub port: u16,

    /// Number of runtime worker threads.
    pub workers: usize,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "demo-app".to_string(),
            app_version: "1.0.0".to_string(),
            environment: "dev".to_string(),
            log_level: None,
            enable_metrics: true,
            enable_cloudwatch: false,
            cloudwatch_endpoint: None,
            metrics_push_timeout_ms: 2000,
            aws_region: "us-east-1".to_string(),
            cors_origins: "*".to_string(),
            secret_key: None,
            port: 8080,
            workers: 4,
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Profile selected by the environment name.
    pub fn profile(&self) -> Profile {
        Profile::from_environment(&self.environment)
    }

    /// Log level after applying the profile default.
    pub fn effective_log_level(&self) -> LogLevel {
        self.log_level.unwrap_or_else(|| self.profile().default_log_level())
    }

    /// Namespace for externally pushed metrics: `<app>/<environment>`.
    pub fn metrics_namespace(&self) -> String {
        format!("{}/{}", self.app_name, self.environment)
    }

    /// Address the HTTP listener binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// Environment profile. Unknown environment names fall back to development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Staging,
    Production,
}

impl Profile {
    pub fn from_environment(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "staging" => Profile::Staging,
            "prod" | "production" => Profile::Production,
            _ => Profile::Development,
        }
    }

    pub fn default_log_level(self) -> LogLevel {
        match self {
            Profile::Development => LogLevel::Debug,
            Profile::Staging | Profile::Production => LogLevel::Info,
        }
    }
}

/// Log severity as named in the emitted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised level name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level `{0}`")]
pub struct UnknownLogLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "TRACE" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" | "CRITICAL" => Ok(LogLevel::Error),
            _ => Err(UnknownLogLevel(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Accepts real booleans or strings; only a case-insensitive `true` is true.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
    })
}
