//! Pluggable readiness checks.
//!
//! # Responsibilities
//! - Define the `ReadinessCheck` trait dependencies implement
//! - Run every registered check concurrently
//! - Aggregate results: ready only when every check reports ok

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Serialize;

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Failed,
}

impl CheckStatus {
    pub fn is_ok(self) -> bool {
        self == CheckStatus::Ok
    }
}

impl From<bool> for CheckStatus {
    fn from(ok: bool) -> Self {
        if ok {
            CheckStatus::Ok
        } else {
            CheckStatus::Failed
        }
    }
}

/// A named dependency check consulted by the readiness probe.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> CheckStatus;
}

/// Aggregated readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessReport {
    pub ready: bool,
    pub checks: BTreeMap<String, CheckStatus>,
}

/// The set of checks behind `/health/ready`. Empty means always ready.
#[derive(Clone, Default)]
pub struct ReadinessChecks {
    checks: Vec<Arc<dyn ReadinessCheck>>,
}

impl ReadinessChecks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, check: impl ReadinessCheck + 'static) {
        self.checks.push(Arc::new(check));
    }

    pub fn with(mut self, check: impl ReadinessCheck + 'static) -> Self {
        self.register(check);
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub async fn run(&self) -> ReadinessReport {
        let results = join_all(self.checks.iter().map(|check| async move {
            let status = check.check().await;
            if !status.is_ok() {
                tracing::warn!(check = check.name(), "Readiness check failed");
            }
            (check.name().to_string(), status)
        }))
        .await;

        ReadinessReport {
            ready: results.iter().all(|(_, status)| status.is_ok()),
            checks: results.into_iter().collect(),
        }
    }
}
