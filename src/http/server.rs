//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with probe, API and metrics handlers
//! - Wire up middleware (request ID, access log, metrics, limits, faults, CORS)
//! - Bind server to listener
//! - Graceful shutdown on the lifecycle signal

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::config::validation::cors_origin_list;
use crate::config::AppConfig;
use crate::health::{self, ReadinessChecks};
use crate::http::middleware::{access_log_middleware, fault_middleware, metrics_middleware};
use crate::http::request::request_id_middleware;
use crate::observability::context::X_REQUEST_ID;
use crate::observability::metrics::{MetricsError, METRICS_PATH, UPKEEP_INTERVAL};
use crate::observability::sink::{self, MetricSink};
use crate::observability::MetricsRecorder;
use crate::api;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// `None` when metrics are disabled.
    pub metrics: Option<Arc<MetricsRecorder>>,
    pub readiness: Arc<ReadinessChecks>,
    pub hostname: Arc<str>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        sink: Arc<dyn MetricSink>,
        readiness: ReadinessChecks,
    ) -> Result<Self, MetricsError> {
        let metrics = if config.enable_metrics {
            Some(Arc::new(MetricsRecorder::new(&config, sink)?))
        } else {
            tracing::info!("Metrics disabled by configuration");
            None
        };

        Ok(Self {
            config: Arc::new(config),
            metrics,
            readiness: Arc::new(readiness),
            hostname: hostname().into(),
        })
    }

    /// State with the sink selected by configuration and no readiness checks.
    pub fn from_config(config: AppConfig) -> Result<Self, MetricsError> {
        let sink = if config.enable_metrics {
            sink::from_config(&config)
        } else {
            Arc::new(sink::NoopSink)
        };
        Self::new(config, sink, ReadinessChecks::new())
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            std::fs::read_to_string("/proc/sys/kernel/hostname")
                .ok()
                .map(|h| h.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Probe and demonstration routes served by default.
pub fn app_routes() -> Router<AppState> {
    Router::new().merge(health::routes()).merge(api::routes())
}

/// Build the full application: `routes` plus the metrics endpoint, wrapped in
/// every middleware layer.
#[allow(deprecated)]
pub fn build_router(state: AppState, routes: Router<AppState>) -> Router {
    let config = Arc::clone(&state.config);

    let mut router = routes;
    if state.metrics.is_some() {
        router = router.route(METRICS_PATH, get(metrics_handler));
    }

    let mut router = router
        .fallback(not_found)
        .layer(middleware::from_fn(fault_middleware))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(cors_layer(&config.cors_origins));

    if let Some(metrics) = state.metrics.clone() {
        router = router.layer(middleware::from_fn_with_state(metrics, metrics_middleware));
    }

    router
        .layer(middleware::from_fn(access_log_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

fn cors_layer(raw: &str) -> CorsLayer {
    let origins = cors_origin_list(raw);
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            origins
                .into_iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(X_REQUEST_ID)])
}

/// `GET /metrics`: Prometheus exposition text.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(metrics) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            metrics.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl HttpServer {
    /// Create a server with the default routes and configuration-selected sink.
    pub fn new(config: AppConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(config)?;
        Ok(Self::with_state(state, app_routes()))
    }

    pub fn with_state(state: AppState, routes: Router<AppState>) -> Self {
        let config = Arc::clone(&state.config);
        let metrics = state.metrics.clone();
        let router = build_router(state, routes);
        Self {
            router,
            config,
            metrics,
        }
    }

    /// Run the server, accepting connections on the given listener until a
    /// shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            app_name = %self.config.app_name,
            version = %self.config.app_version,
            environment = %self.config.environment,
            "HTTP server starting"
        );

        let upkeep = self
            .metrics
            .map(|metrics| metrics.spawn_upkeep(UPKEEP_INTERVAL, shutdown.resubscribe()));
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await;

        if let Some(task) = upkeep {
            if served.is_err() {
                task.abort();
            }
            let _ = task.await;
        }
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Router with every layer applied, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
