//! OS signal handling.
//!
//! # Responsibilities
//! - SIGTERM and SIGINT trigger graceful shutdown
//! - SIGHUP re-reads the configuration file
//!
//! A second SIGTERM/SIGINT after shutdown began exits the process.

use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::config::watcher::reload_into;
use crate::config::AppConfig;
use crate::lifecycle::Shutdown;

/// Spawn the signal listener.
pub fn spawn_signal_handler(
    shutdown: Shutdown,
    config_path: PathBuf,
    reload_tx: mpsc::UnboundedSender<AppConfig>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut triggered = false;
        loop {
            tokio::select! {
                _ = terminate() => {
                    if triggered {
                        tracing::warn!("Second shutdown signal received, exiting immediately");
                        std::process::exit(1);
                    }
                    tracing::info!("Shutdown signal received");
                    shutdown.trigger();
                    triggered = true;
                }
                _ = hangup() => {
                    tracing::info!(path = %config_path.display(), "SIGHUP received, reloading configuration");
                    reload_into(&config_path, &reload_tx);
                }
            }
        }
    })
}

async fn terminate() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = sigterm => {}
    }
}

#[cfg(unix)]
async fn hangup() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::hangup()) {
        Ok(mut s) => {
            s.recv().await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGHUP handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn hangup() {
    std::future::pending::<()>().await
}
