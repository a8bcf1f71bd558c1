mod config;

use anyhow::{Context, Result};
use avrtrim_calibration::load_calibration;
use avrtrim_core::{ChangeCoordinator, TrimError};
use avrtrim_device_denon::DenonReceiver;
use clap::Parser;
use config::{AppConfig, Cli};
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(cli.log_dir.as_deref())?;

    tracing::info!("Starting AVR Trim - adaptive surround/height trims");

    let config = AppConfig::load(&cli)?;

    // An invalid partition must stop us before any volume is processed
    let partition = config
        .channels
        .partition()
        .context("Invalid [channels] configuration")?;

    let coordinator_config = config.coordinator_config(partition)?;
    let calibration = load_calibration(&config.calibration.dir).await?;

    let (receiver, events) =
        DenonReceiver::connect(config.receiver_host()?, config.connect_options()).await?;
    let receiver = Arc::new(receiver);

    // Prompt an initial notification so trims match the current volume
    if let Err(e) = receiver.query_main_volume().await {
        tracing::warn!("Failed to query main volume: {:#}", e);
    }

    let coordinator = ChangeCoordinator::from_calibration(receiver.clone(), &calibration, coordinator_config);
    match coordinator.reference_volume() {
        Some(reference) => tracing::info!("Reference volume: {}", reference),
        None => tracing::warn!("{}; volume changes will not adjust trims", TrimError::MissingReferenceVolume),
    }

    coordinator.run(events, shutdown_signal()).await;

    receiver.close();
    tracing::info!("AVR Trim stopped");
    Ok(())
}

fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory '{}'", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "avrtrim.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,avrtrim=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
