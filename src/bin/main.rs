use std::sync::Arc;

use anyhow::Context;
use poem::listener::TcpListener;
use qr_forge::settings::{get_config, prepare_log_dir, probe_writable};
use qr_forge::{AppState, init_openapi_route};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config()?;
    let log_dir = prepare_log_dir(&config.app_log_dir)?;

    // Logging to stdout and file
    let file_appender = tracing_appender::rolling::daily(&log_dir.path, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!("Initializing QR Code Service v{}...", env!("CARGO_PKG_VERSION"));
    tracing::info!("using {} as environment variables", config.source());
    tracing::info!("run with config: {:?}", config);
    if let Ok(cwd) = std::env::current_dir() {
        tracing::info!("working directory: {}", cwd.display());
    }
    tracing::info!("log directory: {}", log_dir.path.display());
    if let Some(reason) = &log_dir.fallback_reason {
        tracing::warn!("log directory fell back to {}: {}", log_dir.path.display(), reason);
    }
    match probe_writable(&log_dir.path) {
        Ok(()) => tracing::info!("log directory is writable"),
        Err(e) => tracing::warn!("log directory is not writable: {}", e),
    }

    // Init App State
    let app_state = Arc::new(AppState::new(&config, log_dir.path.clone()));
    tracing::info!("QR engine initialized successfully");

    let app = init_openapi_route(app_state, &config);
    tracing::info!("run server on {}:{}", config.host, config.port);
    poem::Server::new(TcpListener::bind(format!("{}:{}", config.host, config.port)))
        .run(app)
        .await
        .context("server stopped unexpectedly")
}
