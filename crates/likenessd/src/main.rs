use anyhow::Result;
use likenessd::config::Config;
use likenessd::controller::SessionController;
use likenessd::engine_client::RemoteEngine;
use likenessd::intake::ImageIntake;
use likenessd::transport;
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(
        gateway = %config.gateway_socket.display(),
        engine = %config.engine_socket.display(),
        tmp_dir = %config.tmp_dir.display(),
        timeout_secs = config.session_timeout.as_secs(),
        "likenessd starting"
    );

    let intake = ImageIntake::new(config.tmp_dir.clone())?;
    let engine = Arc::new(RemoteEngine::new(config.engine_socket.clone()));

    let (notice_tx, notice_rx) = mpsc::channel(64);
    let controller = SessionController::new(engine, intake, &config, notice_tx);

    if let Some(parent) = config.gateway_socket.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Remove a stale socket from a previous run.
    match std::fs::remove_file(&config.gateway_socket) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    let listener = UnixListener::bind(&config.gateway_socket)?;
    tracing::info!("likenessd ready");

    tokio::select! {
        result = transport::serve(listener, controller.clone(), notice_rx) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("likenessd shutting down");
            controller.shutdown().await;
        }
    }

    Ok(())
}
