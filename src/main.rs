use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use solver_matcher::api;
use solver_matcher::config::{Config, LogFormat};
use solver_matcher::engine::expiry::run_expiry_sweeper;
use solver_matcher::engine::worker::run_notification_workers;
use solver_matcher::error::AppError;
use solver_matcher::state::AppState;
use solver_matcher::store::NotificationSink;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Compact => subscriber.compact().init(),
    }

    let (app_state, notification_rx) = AppState::new(&config);
    let shared_state = Arc::new(app_state);

    let sink: Arc<dyn NotificationSink> = shared_state.notifications.clone();
    let (stop_workers, workers_stopped) = oneshot::channel::<()>();
    let workers = tokio::spawn(run_notification_workers(
        sink,
        notification_rx,
        shared_state.worker_settings,
        shared_state.metrics.clone(),
        async move {
            let _ = workers_stopped.await;
        },
    ));

    let sweeper = tokio::spawn(run_expiry_sweeper(
        shared_state.notifications.clone(),
        config.expiry_sweep_interval(),
    ));

    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    sweeper.abort();

    // Websocket tasks may still hold the state, so close the queue directly.
    let _ = stop_workers.send(());
    drop(shared_state);
    if tokio::time::timeout(DRAIN_TIMEOUT, workers).await.is_err() {
        tracing::warn!("notification workers did not drain before shutdown timeout");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
