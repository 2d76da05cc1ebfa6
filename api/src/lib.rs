//! Tenantlog API Server
//!
//! This crate is the HTTP boundary of the Tenantlog logging subsystem. It
//! owns the composition root (broadcaster, counters, persisters, logger) and
//! exposes tenant health, process counters and the database log.
//!
//! # Architecture
//!
//! The API server is built on Axum and Tokio, providing:
//! - `GET /health` for load balancers
//! - `GET /api/v1/tenants/health` and `GET /api/v1/tenants/{tenant_id}/health`
//! - `GET /api/v1/metrics/counters`
//! - `POST /api/v1/logs` to log through the pipeline, `GET /api/v1/logs` to query
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod routes;
mod state;

pub use config::Config;
pub use state::AppState;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Runs the Tenantlog API server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the Tenantlog API server with the provided configuration.
///
/// The queued persisters are drained before returning, so every entry
/// logged before shutdown reaches the database and file logs.
///
/// # Errors
///
/// Returns an error if:
/// - The file log cannot be opened
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        verbosity = ?config.logger.verbosity,
        log_dir = %config.logger.log_dir.display(),
        "Tenantlog API server starting"
    );

    let state = AppState::from_config(&config.logger)?;
    let app = create_router(state.clone());
    let listener = TcpListener::bind(addr).await?;

    state.logger().info(format!("Listening on {addr}"));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes(state.clone()))
        .merge(routes::tenant_routes(state.clone()))
        .merge(routes::metrics_routes(state.clone()))
        .merge(routes::logs_routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
