//! Configuration loading.
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML file,
//! then the process environment.

use std::collections::BTreeMap;
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables holding numbers, flags or levels, lowercased to
/// field names. Figment parses their values.
pub const TYPED_ENV_KEYS: &[&str] = &[
    "LOG_LEVEL",
    "ENABLE_METRICS",
    "ENABLE_CLOUDWATCH",
    "METRICS_PUSH_TIMEOUT_MS",
    "PORT",
    "WORKERS",
    "REQUEST_TIMEOUT_SECS",
    "MAX_BODY_BYTES",
];

/// Environment variables for string fields. Taken verbatim so values such as
/// `APP_VERSION=2.0` or `SECRET_KEY=12345` stay strings.
pub const STRING_ENV_KEYS: &[&str] = &[
    "APP_NAME",
    "APP_VERSION",
    "ENVIRONMENT",
    "AWS_REGION",
    "CORS_ORIGINS",
    "SECRET_KEY",
    "CLOUDWATCH_ENDPOINT",
];

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Parse error: {0}")]
    Parse(#[from] Box<figment::Error>),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the layered provider without extracting it.
pub fn figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }
    figment
        .merge(Env::raw().only(TYPED_ENV_KEYS))
        .merge(Serialized::defaults(string_env()))
}

fn string_env() -> BTreeMap<String, String> {
    STRING_ENV_KEYS
        .iter()
        .filter_map(|key| {
            std::env::var(key)
                .ok()
                .map(|value| (key.to_ascii_lowercase(), value))
        })
        .collect()
}

/// Load and validate configuration.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = figment(path).extract().map_err(Box::new)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
