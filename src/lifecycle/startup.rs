//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the provider registry from configuration
//! - Wire the health monitor into the failover manager
//! - Apply reloaded configuration to both
//!
//! Provider definitions are read once. A reload changes failover and
//! monitoring settings but not the set of provider clients.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::failover::FailoverManager;
use crate::health::HealthMonitor;
use crate::provider::ProviderRegistry;

/// Core services shared by the daemon's tasks.
#[derive(Debug, Clone)]
pub struct Services {
    pub registry: ProviderRegistry,
    pub monitor: Arc<HealthMonitor>,
    pub manager: Arc<FailoverManager>,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Self {
        let registry = ProviderRegistry::from_config(&config.providers);
        Self::with_registry(config, registry, Arc::new(SystemClock))
    }

    /// Build services around an existing registry.
    pub fn with_registry(config: &AppConfig, registry: ProviderRegistry, clock: Arc<dyn Clock>) -> Self {
        let monitor = Arc::new(HealthMonitor::with_clock(
            config.health.clone(),
            registry.clone(),
            clock.clone(),
        ));
        let manager = Arc::new(
            FailoverManager::with_clock(config.failover.clone(), registry.clone(), clock)
                .with_health_monitor(monitor.clone()),
        );

        tracing::info!(
            providers = registry.len(),
            primary = %config.failover.primary_provider,
            "Services initialized"
        );

        Self {
            registry,
            monitor,
            manager,
        }
    }

    /// Apply a validated configuration.
    pub fn apply_config(&self, config: &AppConfig) {
        let known = self.registry.names();
        for provider in &config.providers {
            if !known.contains(&provider.name) {
                tracing::warn!(provider = %provider.name, "New provider definitions take effect after restart");
            }
        }

        self.manager.update_config(config.failover.clone());
        self.monitor.update_config(config.health.clone());
    }
}
