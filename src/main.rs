//! demo-service
//!
//! A minimal containerized web service: orchestrator probes, a small JSON
//! API, structured JSON logging and Prometheus metrics.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────┐
//!                   │                   demo-service                   │
//!   Client Request  │  ┌──────────┐  ┌──────────┐  ┌──────────────┐    │
//!   ────────────────┼─▶│request_id│─▶│access_log│─▶│   metrics    │    │
//!                   │  └──────────┘  └──────────┘  └──────┬───────┘    │
//!                   │                                     ▼            │
//!                   │                 ┌──────────┐  ┌──────────────┐   │
//!   Client Response │                 │  faults  │◀─│timeout/limits│   │
//!   ◀───────────────┼──────────────── └────┬─────┘  └──────────────┘   │
//!                   │                      ▼                           │
//!                   │        ┌─────────────────────────────┐           │
//!                   │        │ handlers: /health* /api/* / │           │
//!                   │        └─────────────────────────────┘           │
//!                   │                                                  │
//!                   │  stdout: JSON lines    /metrics: Prometheus text │
//!                   │  optional push: HTTP metrics sink                │
//!                   └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use demo_service::config::load_config;
use demo_service::lifecycle;
use demo_service::observability::logging;

#[derive(Parser)]
#[command(name = "demo-service")]
#[command(about = "Minimal web service with probes, JSON logging and metrics", long_about = None)]
struct Args {
    /// Optional TOML file layered under the environment variables.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logging is not up yet; configuration errors go to stderr.
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("demo-service: invalid configuration: {e}");
            return Err(e.into());
        }
    };

    logging::init(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()?;

    tracing::info!(
        port = config.port,
        workers = config.workers,
        metrics_enabled = config.enable_metrics,
        cloudwatch_enabled = config.enable_cloudwatch,
        "Configuration loaded"
    );

    if let Err(e) = runtime.block_on(lifecycle::serve(config)) {
        tracing::error!(error = %e, "Startup failed");
        return Err(e.into());
    }
    Ok(())
}
