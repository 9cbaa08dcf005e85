//! Provider failover daemon.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                  FAILOVER DAEMON                      │
//!                 │                                                       │
//!   Admin API     │  ┌─────────┐    ┌──────────────────┐                  │
//!   ──────────────┼─▶│  admin  │───▶│ FailoverManager  │──────────────────┼──▶ Providers
//!                 │  │ router  │    │ candidates/state │                  │
//!                 │  └────┬────┘    └────────┬─────────┘                  │
//!                 │       │                  │ health scores              │
//!                 │       │         ┌────────▼─────────┐                  │
//!                 │       └────────▶│  HealthMonitor   │──── probes ──────┼──▶ Providers
//!                 │                 │ series/alerts    │──── webhook ─────┼──▶ Alert sink
//!                 │                 └──────────────────┘                  │
//!                 │                                                       │
//!                 │  config watcher · signals · recovery sweep · metrics  │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;

use provider_failover::admin::{setup_admin_router, AdminState};
use provider_failover::config::loader::load_config;
use provider_failover::config::watcher::ConfigWatcher;
use provider_failover::lifecycle::{signals, Services, Shutdown};
use provider_failover::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "provider-failover")]
#[command(about = "Provider failover and health monitoring daemon", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "provider-failover starting");
    tracing::info!(
        path = %args.config.display(),
        providers = config.providers.len(),
        primary = %config.failover.primary_provider,
        check_interval_ms = config.health.check_interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let services = Services::from_config(&config);
    let shutdown = Shutdown::new();

    services.monitor.start();
    let sweep = services.manager.spawn_recovery_sweep(
        Duration::from_millis(config.failover.recovery_sweep_interval_ms),
        shutdown.subscribe(),
    );

    // Hot reload: file watcher and SIGHUP share one channel.
    let (watcher, mut reload_rx) = ConfigWatcher::new(&args.config);
    signals::spawn_signal_handler(shutdown.clone(), args.config.clone(), watcher.sender());
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start config watcher; reload via SIGHUP only");
            None
        }
    };

    let reload_services = services.clone();
    let mut reload_shutdown = shutdown.subscribe();
    let reloader = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(new_config) = reload_rx.recv() => {
                    reload_services.apply_config(&new_config);
                    tracing::info!("Configuration reloaded");
                }
                _ = reload_shutdown.recv() => break,
            }
        }
    });

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let state = AdminState::new(
            services.manager.clone(),
            services.monitor.clone(),
            config.admin.api_key.clone(),
        );
        let app = setup_admin_router(state);
        let server_shutdown = shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.wait().await })
            .await?;
        tracing::info!("Admin API stopped");
    } else {
        shutdown.wait().await;
    }

    services.monitor.stop();
    let _ = sweep.await;
    let _ = reloader.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
