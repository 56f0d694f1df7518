use crate::{config::Config, errors::ApiError};
use axum::{http::Request, middleware::Next, response::Response};
use tracing::info;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::{fmt, layer::SubscriberExt, Layer, Registry};

pub fn setup_logging(config: &Config) -> Result<(), ApiError> {
    let level: LevelFilter = config
        .log_level
        .parse()
        .map_err(|e| ApiError::Config(format!("Invalid log level: {e}")))?;

    // Chatty dependencies stay at warn unless we are tracing everything
    let dependency_level = if level == LevelFilter::TRACE {
        LevelFilter::TRACE
    } else {
        LevelFilter::WARN
    };
    let filter = Targets::new()
        .with_default(level)
        .with_target("hyper", dependency_level)
        .with_target("reqwest", dependency_level)
        .with_target("solana_client", dependency_level);

    let stdout_layer = if config.log_format == "json" {
        fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_filter(filter)
            .boxed()
    };

    let subscriber = Registry::default().with(stdout_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ApiError::Config(format!("Failed to set global default subscriber: {e}")))?;

    Ok(())
}

/// Logs every incoming request before it reaches a handler
pub async fn log_request<B>(req: Request<B>, next: Next<B>) -> Response {
    info!(
        method = %req.method(),
        uri = req.uri().path(),
        "Incoming request: {} {}",
        req.method(),
        req.uri().path()
    );
    next.run(req).await
}
