//! HTTP server initialization and runtime setup.
//!
//! Builds the request logger, starts the remote dispatcher when configured and
//! runs the Axum server until Ctrl+C.

use crate::api::handlers::CollectorState;
use crate::config::Config;
use crate::routes::{app_router, collector_router};
use crate::state::AppState;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;

/// Runs the demo service with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - The request logger configuration is rejected
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let logger = config
        .logger_builder()
        .build()
        .context("Invalid request logger configuration")?;
    tracing::info!(sink = logger.sink().name(), "Request logger ready");

    let app = app_router(AppState::new(logger));

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Runs the log collector, appending every payload to `output`.
///
/// # Errors
///
/// Returns an error if the output file cannot be opened, the address is
/// invalid, or the server fails.
pub async fn run_receiver(listen: &str, output: &Path) -> Result<()> {
    let state = CollectorState::open(output)
        .await
        .with_context(|| format!("Failed to open {}", output.display()))?;
    tracing::info!(output = %output.display(), "Collector output ready");

    let addr: SocketAddr = listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Collector listening on http://{addr}");

    axum::serve(listener, collector_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Collector stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
