//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. All problems are
//! reported together so a misconfigured deployment can be fixed in one pass.

use axum::http::HeaderValue;

use crate::config::schema::{AppConfig, Profile};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("SECRET_KEY environment variable must be set in production")]
    MissingSecret,

    #[error("port must be non-zero")]
    InvalidPort,

    #[error("workers must be at least 1")]
    NoWorkers,

    #[error("request timeout must be at least 1 second")]
    InvalidTimeout,

    #[error("invalid CORS origin `{0}`")]
    InvalidCorsOrigin(String),
}

/// Validate a loaded configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.profile() == Profile::Production
        && config.secret_key.as_deref().is_none_or(|s| s.trim().is_empty())
    {
        errors.push(ValidationError::MissingSecret);
    }

    if config.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    if config.workers == 0 {
        errors.push(ValidationError::NoWorkers);
    }

    if config.request_timeout_secs == 0 {
        errors.push(ValidationError::InvalidTimeout);
    }

    for origin in cors_origin_list(&config.cors_origins) {
        if HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::InvalidCorsOrigin(origin.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Explicit origins from `CORS_ORIGINS`; empty when every origin is allowed.
pub fn cors_origin_list(raw: &str) -> Vec<&str> {
    if raw.trim() == "*" {
        return Vec::new();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let config = AppConfig {
            environment: "production".into(),
            secret_key: Some("  ".into()),
            port: 0,
            workers: 0,
            ..AppConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingSecret,
                ValidationError::InvalidPort,
                ValidationError::NoWorkers,
            ]
        );
    }

    #[test]
    fn test_cors_origins() {
        assert!(cors_origin_list("*").is_empty());
        assert_eq!(
            cors_origin_list("https://a.example, https://b.example,"),
            vec!["https://a.example", "https://b.example"]
        );

        let config = AppConfig {
            cors_origins: "https://ok.example,bad\norigin".into(),
            ..AppConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidCorsOrigin("bad\norigin".into())]
        );
    }
}
