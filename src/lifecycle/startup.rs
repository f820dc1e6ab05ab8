//! Startup orchestration.
//!
//! Builds subsystems in dependency order, binds the listener last so traffic
//! only arrives once everything is ready, then serves until shutdown.
//! Any failure here is fatal; nothing is retried.

use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_listener;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Build the server from `config`, bind, and serve until SIGINT/SIGTERM.
pub async fn serve(config: AppConfig) -> Result<(), StartupError> {
    let address = config.bind_address();
    let server = HttpServer::new(config)?;

    tracing::info!(
        app_name = %server.config().app_name,
        version = %server.config().app_version,
        environment = %server.config().environment,
        "Application created"
    );

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.sender());

    server.run(listener, shutdown.subscribe()).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
