//! Active health monitoring.
//!
//! # Responsibilities
//! - Periodically probe every monitored provider, independent of traffic
//! - Keep a bounded metric series per provider
//! - Derive provider status and raise throttled alerts

use arc_swap::ArcSwap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, oneshot, Mutex as AsyncMutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};

use crate::clock::{Clock, SystemClock};
use crate::config::HealthMonitorConfig;
use crate::failover::ScoreWeights;
use crate::health::alerts::{self, AlertDispatcher, HealthAlert};
use crate::health::series::{HealthMetric, HealthStatistics, MetricSeries, ProviderStatus};
use crate::observability::metrics;
use crate::provider::{Provider, ProviderRegistry};

struct MonitorTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Serializable snapshot of everything the monitor knows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthExport {
    pub exported_at: u64,
    pub config: HealthMonitorConfig,
    pub statuses: Vec<ProviderStatus>,
    pub metrics: BTreeMap<String, Vec<HealthMetric>>,
}

pub struct HealthMonitor {
    registry: ProviderRegistry,
    config: ArcSwap<HealthMonitorConfig>,
    series: DashMap<String, MetricSeries>,
    statuses: DashMap<String, ProviderStatus>,
    last_alerts: DashMap<String, u64>,
    alerts: AlertDispatcher,
    clock: Arc<dyn Clock>,
    task: Mutex<Option<MonitorTask>>,
    /// Held for a whole cycle so cycles never overlap.
    cycle: AsyncMutex<()>,
}

impl HealthMonitor {
    pub fn new(config: HealthMonitorConfig, registry: ProviderRegistry) -> Self {
        Self::with_clock(config, registry, Arc::new(SystemClock))
    }

    pub fn with_clock(config: HealthMonitorConfig, registry: ProviderRegistry, clock: Arc<dyn Clock>) -> Self {
        let monitor = Self {
            registry,
            config: ArcSwap::from_pointee(config),
            series: DashMap::new(),
            statuses: DashMap::new(),
            last_alerts: DashMap::new(),
            alerts: AlertDispatcher::new(),
            clock,
            task: Mutex::new(None),
            cycle: AsyncMutex::new(()),
        };
        monitor.seed_statuses();
        monitor
    }

    pub fn config(&self) -> HealthMonitorConfig {
        self.config.load().as_ref().clone()
    }

    /// Names probed each cycle.
    pub fn monitored_names(&self) -> Vec<String> {
        let config = self.config.load();
        if config.providers.is_empty() {
            self.registry.names()
        } else {
            config.providers.clone()
        }
    }

    fn monitored_providers(&self) -> Vec<Arc<dyn Provider>> {
        self.monitored_names()
            .iter()
            .map(|name| self.registry.resolve(name))
            .collect()
    }

    fn seed_statuses(&self) {
        for name in self.monitored_names() {
            self.statuses.entry(name.clone()).or_insert_with(|| ProviderStatus {
                provider: name,
                ..Default::default()
            });
        }
    }

    fn task_slot(&self) -> MutexGuard<'_, Option<MonitorTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the probe timer. The first cycle runs immediately.
    ///
    /// Returns false if the monitor was already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut slot = self.task_slot();
        if slot.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return false;
        }

        let interval = Duration::from_millis(self.config.load().check_interval_ms.max(1));
        let (stop, mut stop_rx) = oneshot::channel();
        let monitor: Weak<Self> = Arc::downgrade(self);

        tracing::info!(interval_ms = interval.as_millis() as u64, "Health monitor starting");

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(monitor) = monitor.upgrade() else { break };
                        monitor.run_health_checks().await;
                    }
                    _ = &mut stop_rx => {
                        tracing::info!("Health monitor stopped");
                        break;
                    }
                }
            }
        });

        *slot = Some(MonitorTask { stop, handle });
        true
    }

    /// Stop the probe timer. Returns false if it was not running.
    pub fn stop(&self) -> bool {
        match self.task_slot().take() {
            Some(task) => {
                let running = !task.handle.is_finished();
                let _ = task.stop.send(());
                running
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_slot()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Replace the configuration, restarting the timer if it was running.
    pub fn update_config(self: &Arc<Self>, config: HealthMonitorConfig) {
        let was_running = self.stop();
        self.config.store(Arc::new(config));
        self.seed_statuses();
        tracing::info!("Health monitor configuration updated");
        if was_running {
            self.start();
        }
    }

    /// Probe every monitored provider concurrently and wait for all of them.
    ///
    /// A cycle started while another is running waits for it to finish.
    pub async fn run_health_checks(self: &Arc<Self>) {
        let _cycle = self.cycle.lock().await;
        let mut probes = JoinSet::new();
        for provider in self.monitored_providers() {
            let monitor = Arc::clone(self);
            probes.spawn(async move {
                monitor.check_provider_health(provider.as_ref()).await;
            });
        }

        while let Some(result) = probes.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Health probe task failed");
            }
        }

        let pruned = self.prune_expired();
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped expired health metrics");
        }
    }

    /// Probe one provider. Errors become an unhealthy metric.
    pub async fn check_provider_health(&self, provider: &dyn Provider) -> HealthMetric {
        let name = provider.name().to_string();
        let start = Instant::now();
        let result = provider.health_check().await;
        let latency = start.elapsed().as_millis() as u64;

        let (is_healthy, error) = match result {
            Ok(check) => (check.is_healthy, check.error),
            Err(e) => (false, Some(e.to_string())),
        };

        if is_healthy {
            tracing::debug!(provider = %name, latency_ms = latency, "Health check passed");
        } else {
            tracing::warn!(provider = %name, latency_ms = latency, error = ?error, "Health check failed");
        }

        let metric = HealthMetric {
            timestamp: self.clock.now_ms(),
            is_healthy,
            latency,
            error,
        };

        metrics::record_provider_health(&name, is_healthy);
        metrics::record_health_check_latency(&name, latency);

        self.record_metric(&name, metric.clone());
        metric
    }

    /// Append a metric, refresh the provider's status, then evaluate alerts.
    pub fn record_metric(&self, provider: &str, metric: HealthMetric) -> ProviderStatus {
        let config = self.config.load();
        let now = metric.timestamp;
        let last_alert = self.last_alerts.get(provider).map(|t| *t);

        // Publish the status while the series entry is still held.
        let (status, window) = {
            let mut series = self.series.entry(provider.to_string()).or_default();
            series.push(metric);
            let status = series.status(provider, last_alert);
            self.statuses.insert(provider.to_string(), status.clone());
            (status, series.statistics(now.saturating_sub(config.statistics_window_ms)))
        };

        self.evaluate_alerts(status, &window, now)
    }

    fn evaluate_alerts(&self, mut status: ProviderStatus, window: &HealthStatistics, now: u64) -> ProviderStatus {
        let config = self.config.load();
        if !config.alerts.enabled {
            return status;
        }

        let triggers = alerts::evaluate(&config.alerts, &status, window);
        if triggers.is_empty() {
            return status;
        }

        let cooldown = config.alerts.cooldown_period_ms;
        let suppressed = match self.last_alerts.entry(status.provider.clone()) {
            Entry::Occupied(mut last) => {
                if now.saturating_sub(*last.get()) < cooldown {
                    true
                } else {
                    last.insert(now);
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                false
            }
        };

        if suppressed {
            tracing::debug!(provider = %status.provider, "Alert suppressed by cooldown");
            return status;
        }

        status.last_alert = Some(now);
        if let Some(mut stored) = self.statuses.get_mut(&status.provider) {
            stored.last_alert = Some(now);
        }

        self.alerts.dispatch(alerts::build_alert(&status, triggers, now), &config.alerts);
        status
    }

    /// Drop metrics older than the retention period. Returns how many were dropped.
    pub fn prune_expired(&self) -> usize {
        let cutoff = self
            .clock
            .now_ms()
            .saturating_sub(self.config.load().retention_period_ms);
        self.series
            .iter_mut()
            .map(|mut series| series.prune_before(cutoff))
            .sum()
    }

    pub fn get_provider_status(&self, provider: &str) -> Option<ProviderStatus> {
        self.statuses.get(provider).map(|s| s.clone())
    }

    /// All statuses, sorted by provider name.
    pub fn get_provider_statuses(&self) -> Vec<ProviderStatus> {
        let mut statuses: Vec<_> = self.statuses.iter().map(|s| s.clone()).collect();
        statuses.sort_by(|a, b| a.provider.cmp(&b.provider));
        statuses
    }

    /// Metrics of a provider at or after `since_ms` (all retained if `None`).
    pub fn get_health_metrics(&self, provider: &str, since_ms: Option<u64>) -> Vec<HealthMetric> {
        self.series
            .get(provider)
            .map(|series| series.since(since_ms.unwrap_or(0)))
            .unwrap_or_default()
    }

    /// Statistics of a provider over the last `window_ms`.
    pub fn get_health_statistics(&self, provider: &str, window_ms: u64) -> HealthStatistics {
        let since = self.clock.now_ms().saturating_sub(window_ms);
        self.series
            .get(provider)
            .map(|series| series.statistics(since))
            .unwrap_or_default()
    }

    /// Composite score from the provider's status. `None` until it has been probed.
    pub fn health_score(&self, provider: &str, weights: &ScoreWeights) -> Option<f64> {
        self.statuses
            .get(provider)
            .filter(|status| status.total_checks > 0)
            .map(|status| weights.score_status(&status))
    }

    /// In-process alert stream.
    pub fn subscribe(&self) -> broadcast::Receiver<HealthAlert> {
        self.alerts.subscribe()
    }

    pub fn export_health_data(&self) -> HealthExport {
        let metrics = self
            .series
            .iter()
            .map(|series| (series.key().clone(), series.since(0)))
            .collect();

        HealthExport {
            exported_at: self.clock.now_ms(),
            config: self.config(),
            statuses: self.get_provider_statuses(),
            metrics,
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("providers", &self.monitored_names())
            .field("running", &self.is_running())
            .finish()
    }
}
