use axum::Server;
use config::Config;
use errors::ApiError;
use state::AppState;
use std::net::SocketAddr;

mod api;
mod cache;
mod config;
mod errors;
mod logging;
mod models;
mod services;
mod state;
mod validation;

#[cfg(test)]
mod test_support;

/// Result type for API
pub type Result<T> = std::result::Result<T, errors::ApiError>;

fn main() -> Result<()> {
    let config = Config::from_env()?;
    logging::setup_logging(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let worker_threads = config.worker_threads;

    // Everything shared is built before the first connection is accepted
    let state = AppState::new(config)?;
    let app = api::initialize_router(state);

    tracing::info!(
        "Server starting on {} with {} worker threads",
        addr,
        worker_threads
    );

    Server::try_bind(&addr)
        .map_err(|e| ApiError::Custom(format!("Failed to bind {addr}: {e}")))?
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Custom(format!("Server error: {e}")))?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
