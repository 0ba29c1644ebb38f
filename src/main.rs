use std::sync::Arc;

use chrono::Duration;
use tokio::time::Duration as TokioDuration;
use tracing_subscriber::EnvFilter;

use delivery_dispatch::dispatch::sweep::run_reconciliation_sweep;
use delivery_dispatch::{api, config, error, state};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let shared_state = Arc::new(state::AppState::new(
        config.event_buffer_size,
        config.default_search_radius_km,
    ));

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(run_reconciliation_sweep(
        shared_state.directory.clone(),
        shared_state.registry.clone(),
        TokioDuration::from_secs(config.sweep_interval_secs),
        Duration::seconds(config.reservation_grace_secs),
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
