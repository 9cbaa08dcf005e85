//! Failover manager.
//!
//! # Responsibilities
//! - Build an ordered list of eligible candidates per request
//! - Attempt candidates sequentially, at most once each
//! - Fold every outcome into the provider's state
//! - Record failover, recovery and circuit events
//!
//! # Concurrency
//! Provider states live in a `DashMap`; every read-modify-write happens
//! under that entry's lock and no lock is held across a provider call.
//! The event log sits behind its own mutex.

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::clock::{Clock, SystemClock};
use crate::config::{FailoverConfig, FailoverMode};
use crate::error::{FailoverError, Result};
use crate::failover::events::{EventLog, FailoverEvent, FailoverEventType};
use crate::failover::state::{ProviderSnapshot, ProviderState};
use crate::failover::stats::FailoverStatistics;
use crate::health::HealthMonitor;
use crate::observability::metrics;
use crate::provider::{ProviderRegistry, ProviderRequest, ProviderResponse};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Successful outcome of [`FailoverManager::execute_with_failover`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverResult {
    pub response: ProviderResponse,
    /// Provider that served the request.
    pub provider: String,
    /// True if the serving provider is not the current provider.
    pub failover_occurred: bool,
    pub attempts: u32,
}

/// Serializable snapshot of the manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverExport {
    pub exported_at: u64,
    pub config: FailoverConfig,
    pub current_provider: String,
    pub states: Vec<ProviderSnapshot>,
    pub events: Vec<FailoverEvent>,
    pub statistics: FailoverStatistics,
}

pub struct FailoverManager {
    registry: ProviderRegistry,
    config: ArcSwap<FailoverConfig>,
    states: DashMap<String, ProviderState>,
    current_provider: RwLock<String>,
    events: Mutex<EventLog>,
    event_tx: broadcast::Sender<FailoverEvent>,
    monitor: Option<Arc<HealthMonitor>>,
    clock: Arc<dyn Clock>,
}

impl FailoverManager {
    pub fn new(config: FailoverConfig, registry: ProviderRegistry) -> Self {
        Self::with_clock(config, registry, Arc::new(SystemClock))
    }

    pub fn with_clock(config: FailoverConfig, registry: ProviderRegistry, clock: Arc<dyn Clock>) -> Self {
        let states = DashMap::new();
        for name in config.provider_names() {
            states.insert(name.clone(), ProviderState::new(name));
        }
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            primary = %config.primary_provider,
            fallbacks = ?config.fallback_providers,
            enabled = config.enabled,
            "Failover manager initialized"
        );

        Self {
            registry,
            current_provider: RwLock::new(config.primary_provider.clone()),
            config: ArcSwap::from_pointee(config),
            states,
            events: Mutex::new(EventLog::default()),
            event_tx,
            monitor: None,
            clock,
        }
    }

    /// Use the monitor's health scores to rank fallbacks and gate recovery.
    pub fn with_health_monitor(mut self, monitor: Arc<HealthMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn config(&self) -> FailoverConfig {
        self.config.load().as_ref().clone()
    }

    pub fn current_provider(&self) -> String {
        self.current_provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current_provider(&self, name: &str) -> String {
        let mut current = self.current_provider.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, name.to_string())
    }

    fn event_log(&self) -> MutexGuard<'_, EventLog> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append_event(&self, event: FailoverEvent) {
        tracing::info!(
            event_type = %event.event_type,
            from = ?event.from_provider,
            to = ?event.to_provider,
            reason = %event.reason,
            "Failover event"
        );
        metrics::record_failover_event(event.event_type.as_str());
        self.event_log().push(event.clone());
        let _ = self.event_tx.send(event);
    }

    /// Stream of appended events.
    pub fn subscribe(&self) -> broadcast::Receiver<FailoverEvent> {
        self.event_tx.subscribe()
    }

    /// Live composite score under the configured weights, if a monitor is
    /// attached and has probed the provider.
    pub fn health_score(&self, provider: &str) -> Option<f64> {
        let weights = self.config.load().strategy.score_weights;
        self.monitor.as_ref()?.health_score(provider, &weights)
    }

    /// Eligible candidates in attempt order.
    ///
    /// Expired open circuits are closed here. The primary always comes
    /// first; the rest follow the configured mode.
    pub fn build_candidates(&self) -> Vec<String> {
        let config = self.config.load();
        let now = self.clock.now_ms();
        let reset_timeout = config.circuit_breaker.reset_timeout_ms;

        let mut eligible = Vec::new();
        for name in config.provider_names() {
            let (closed, is_eligible) = match self.states.get_mut(&name) {
                Some(mut state) => {
                    let closed = state.refresh_circuit(now, reset_timeout);
                    (closed, state.is_eligible(now))
                }
                None => continue,
            };

            if closed {
                metrics::record_circuit_state(&name, false);
                self.append_event(
                    FailoverEvent::new(now, FailoverEventType::CircuitBreakerClosed, "reset_timeout_elapsed")
                        .from_provider(name.clone()),
                );
            }
            if is_eligible {
                eligible.push(name);
            } else {
                tracing::debug!(provider = %name, "Provider excluded from candidates");
            }
        }

        let (mut ordered, mut rest): (Vec<_>, Vec<_>) = eligible
            .into_iter()
            .partition(|name| *name == config.primary_provider);

        if config.strategy.mode == FailoverMode::Priority {
            let mut scored: Vec<(String, f64)> = rest
                .drain(..)
                .map(|name| {
                    let score = self.health_score(&name).unwrap_or(0.0);
                    (name, score)
                })
                .collect();
            // Stable: equal scores keep configured order.
            scored.sort_by(|a, b| b.1.total_cmp(&a.1));
            rest = scored.into_iter().map(|(name, _)| name).collect();
        }

        ordered.extend(rest);
        ordered
    }

    /// Route a request to the first candidate that succeeds.
    ///
    /// Candidates are tried one at a time, each at most once. If all fail,
    /// the error carries the last provider error.
    pub async fn execute_with_failover(&self, request: &ProviderRequest) -> Result<FailoverResult> {
        let config = self.config.load_full();
        let original = self.current_provider();

        let candidates = if config.enabled {
            self.build_candidates()
        } else {
            vec![original.clone()]
        };

        if candidates.is_empty() {
            tracing::error!(request_id = %request.id, "No eligible providers");
            return Err(FailoverError::no_eligible_providers());
        }

        let mut attempts = 0u32;
        let mut last_error = String::new();
        let mut deactivated = Vec::new();

        for name in candidates {
            attempts += 1;
            let provider = self.registry.resolve(&name);
            if let Some(mut state) = self.states.get_mut(&name) {
                state.begin_attempt();
            }

            tracing::debug!(request_id = %request.id, provider = %name, attempt = attempts, "Attempting provider");

            match provider.send_request(request).await {
                Ok(response) => {
                    self.record_success(&name);
                    self.record_deactivations(&deactivated, Some(&name));

                    let failover_occurred = name != original;
                    if failover_occurred {
                        tracing::info!(
                            request_id = %request.id,
                            from = %original,
                            to = %name,
                            attempts,
                            "Request served by fallback provider"
                        );
                    }

                    return Ok(FailoverResult {
                        response,
                        provider: name,
                        failover_occurred,
                        attempts,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        request_id = %request.id,
                        provider = %name,
                        attempt = attempts,
                        error = %e,
                        "Provider attempt failed"
                    );
                    if self.record_failure(&name) {
                        deactivated.push(name);
                    }
                    last_error = e.to_string();
                }
            }
        }

        self.record_deactivations(&deactivated, None);
        tracing::error!(request_id = %request.id, attempts, error = %last_error, "All providers failed");
        Err(FailoverError::AllProvidersExhausted { attempts, last_error })
    }

    fn record_deactivations(&self, deactivated: &[String], served_by: Option<&str>) {
        let now = self.clock.now_ms();
        for name in deactivated {
            let mut event = FailoverEvent::new(now, FailoverEventType::Failover, "max_failures_exceeded")
                .from_provider(name.clone());
            if let Some(to) = served_by {
                event = event.to_provider(to);
                if let Some(score) = self.health_score(to) {
                    event = event.health_score(score);
                }
            }
            self.append_event(event);
        }
    }

    /// Apply a success to `name`. Reactivation of the primary makes it current again.
    pub fn record_success(&self, name: &str) {
        let config = self.config.load();
        metrics::record_request(name, "success");

        let reactivated = match self.states.get_mut(name) {
            Some(mut state) => state.record_success(config.strategy.recovery_threshold),
            None => false,
        };
        if !reactivated {
            return;
        }

        tracing::info!(provider = %name, "Provider reactivated");
        if name == config.primary_provider {
            let previous = self.set_current_provider(name);
            let mut event = FailoverEvent::new(self.clock.now_ms(), FailoverEventType::Recovery, "recovery_threshold_reached")
                .from_provider(previous)
                .to_provider(name);
            if let Some(score) = self.health_score(name) {
                event = event.health_score(score);
            }
            self.append_event(event);
        }
    }

    /// Apply a failure to `name`. Returns true if it deactivated the provider.
    pub fn record_failure(&self, name: &str) -> bool {
        let config = self.config.load();
        let now = self.clock.now_ms();
        metrics::record_request(name, "failure");

        let (outcome, failures) = match self.states.get_mut(name) {
            Some(mut state) => {
                let outcome = state.record_failure(now, &config.strategy, &config.circuit_breaker);
                (outcome, state.consecutive_failures)
            }
            None => return false,
        };

        tracing::debug!(
            provider = %name,
            consecutive_failures = failures,
            backoff_until = outcome.backoff_until,
            "Provider backing off"
        );

        if outcome.deactivated {
            tracing::warn!(provider = %name, consecutive_failures = failures, "Provider marked inactive");
        }
        if outcome.circuit_opened {
            metrics::record_circuit_state(name, true);
            self.append_event(
                FailoverEvent::new(
                    now,
                    FailoverEventType::CircuitBreakerOpen,
                    format!("{} consecutive failures", failures),
                )
                .from_provider(name),
            );
        }
        outcome.deactivated
    }

    /// Make `target` the current provider if it is eligible right now.
    ///
    /// Returns false, changing nothing, if the target is unknown, backing off,
    /// or behind a circuit that has not yet reached its reset timeout.
    pub fn manual_failover(&self, target: &str) -> bool {
        let config = self.config.load();
        let now = self.clock.now_ms();
        let reset_timeout = config.circuit_breaker.reset_timeout_ms;

        let circuit_closed = {
            let Some(mut state) = self.states.get_mut(target) else {
                tracing::warn!(provider = %target, "Manual failover to unknown provider rejected");
                return false;
            };
            let circuit_expired = state.circuit_breaker_open()
                && now.saturating_sub(state.circuit_breaker.last_reset_ms()) >= reset_timeout;
            let circuit_ok = !state.circuit_breaker_open() || circuit_expired;
            if !circuit_ok || state.in_backoff(now) {
                tracing::warn!(provider = %target, "Manual failover rejected: provider not eligible");
                return false;
            }
            circuit_expired && state.refresh_circuit(now, reset_timeout)
        };

        if circuit_closed {
            metrics::record_circuit_state(target, false);
            self.append_event(
                FailoverEvent::new(now, FailoverEventType::CircuitBreakerClosed, "reset_timeout_elapsed")
                    .from_provider(target),
            );
        }

        let previous = self.set_current_provider(target);
        let mut event = FailoverEvent::new(now, FailoverEventType::Failover, "manual_failover")
            .from_provider(previous)
            .to_provider(target);
        if let Some(score) = self.health_score(target) {
            event = event.health_score(score);
        }
        self.append_event(event);
        true
    }

    /// Probe an inactive primary whose health score clears the threshold and
    /// promote it if the probe succeeds. Returns true on promotion.
    pub async fn check_recovery_opportunities(&self) -> bool {
        let config = self.config.load_full();
        let primary = config.primary_provider.clone();

        let inactive = self
            .states
            .get(&primary)
            .map(|state| !state.is_active)
            .unwrap_or(false);
        if !inactive {
            return false;
        }

        let Some(score) = self.health_score(&primary) else {
            tracing::debug!(provider = %primary, "No health data for inactive primary");
            return false;
        };
        if score < config.strategy.health_threshold {
            tracing::debug!(provider = %primary, score, threshold = config.strategy.health_threshold, "Primary not healthy enough to recover");
            return false;
        }

        let provider = self.registry.resolve(&primary);
        match provider.health_check().await {
            Ok(check) if check.is_healthy => {}
            Ok(check) => {
                tracing::debug!(provider = %primary, error = ?check.error, "Recovery probe unhealthy");
                return false;
            }
            Err(e) => {
                tracing::debug!(provider = %primary, error = %e, "Recovery probe failed");
                return false;
            }
        }

        let promoted = match self.states.get_mut(&primary) {
            Some(mut state) if !state.is_active => {
                state.promote();
                true
            }
            _ => false,
        };
        if !promoted {
            return false;
        }

        let previous = self.set_current_provider(&primary);
        tracing::info!(provider = %primary, score, "Primary recovered by health probe");
        self.append_event(
            FailoverEvent::new(self.clock.now_ms(), FailoverEventType::Recovery, "health_check_recovery")
                .from_provider(previous)
                .to_provider(primary)
                .health_score(score),
        );
        true
    }

    /// Run `check_recovery_opportunities` every `interval` until shutdown.
    pub fn spawn_recovery_sweep(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let interval = interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            tracing::info!(interval_ms = interval.as_millis() as u64, "Recovery sweep starting");
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        manager.check_recovery_opportunities().await;
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Recovery sweep received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }

    /// Close every circuit, one `circuit_breaker_closed` event per provider.
    pub fn reset_circuit_breakers(&self) {
        let now = self.clock.now_ms();
        for name in self.state_names() {
            if let Some(mut state) = self.states.get_mut(&name) {
                state.circuit_breaker.force_close(now);
            }
            metrics::record_circuit_state(&name, false);
            self.append_event(
                FailoverEvent::new(now, FailoverEventType::CircuitBreakerClosed, "manual_reset")
                    .from_provider(name),
            );
        }
    }

    /// Swap in a new configuration. Existing provider state is kept.
    pub fn update_config(&self, config: FailoverConfig) {
        let names = config.provider_names();
        for name in &names {
            self.states
                .entry(name.clone())
                .or_insert_with(|| ProviderState::new(name.clone()));
        }

        let current = self.current_provider();
        if !names.contains(&current) {
            tracing::warn!(provider = %current, primary = %config.primary_provider, "Current provider removed from config; reverting to primary");
            self.set_current_provider(&config.primary_provider);
        }

        self.config.store(Arc::new(config));
        tracing::info!("Failover configuration updated");
    }

    /// Configured providers first, in configured order, then any others.
    fn state_names(&self) -> Vec<String> {
        let mut names = self.config.load().provider_names();
        let mut extra: Vec<String> = self
            .states
            .iter()
            .map(|s| s.key().clone())
            .filter(|name| !names.contains(name))
            .collect();
        extra.sort();
        names.extend(extra);
        names
    }

    pub fn get_provider_state(&self, name: &str) -> Option<ProviderSnapshot> {
        let now = self.clock.now_ms();
        self.states.get(name).map(|state| state.snapshot(now))
    }

    pub fn get_provider_states(&self) -> Vec<ProviderSnapshot> {
        self.state_names()
            .iter()
            .filter_map(|name| self.get_provider_state(name))
            .collect()
    }

    /// Retained events, oldest first.
    pub fn get_failover_events(&self) -> Vec<FailoverEvent> {
        self.event_log().snapshot()
    }

    pub fn get_failover_statistics(&self) -> FailoverStatistics {
        let events = self.get_failover_events();
        let current = self.current_provider();
        let uptime = self
            .states
            .get(&current)
            .map(|state| state.uptime())
            .unwrap_or(0.0);
        FailoverStatistics::from_events(&events, current, uptime)
    }

    pub fn export_failover_data(&self) -> FailoverExport {
        FailoverExport {
            exported_at: self.clock.now_ms(),
            config: self.config(),
            current_provider: self.current_provider(),
            states: self.get_provider_states(),
            events: self.get_failover_events(),
            statistics: self.get_failover_statistics(),
        }
    }
}

impl std::fmt::Debug for FailoverManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverManager")
            .field("current_provider", &self.current_provider())
            .field("providers", &self.state_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{CircuitBreakerConfig, FailoverStrategy};
    use crate::provider::{HealthCheckResult, Provider, ProviderError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Switch {
        name: String,
        up: AtomicBool,
        calls: AtomicUsize,
    }

    impl Switch {
        fn new(name: &str, up: bool) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                up: AtomicBool::new(up),
                calls: AtomicUsize::new(0),
            })
        }

        fn set(&self, up: bool) {
            self.up.store(up, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Provider for Switch {
        fn name(&self) -> &str {
            &self.name
        }

        async fn send_request(&self, _request: &ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.up.load(Ordering::SeqCst) {
                Ok(serde_json::json!({ "from": self.name }))
            } else {
                Err(ProviderError::Status { status: 503, body: format!("{} down", self.name) })
            }
        }

        async fn health_check(&self) -> std::result::Result<HealthCheckResult, ProviderError> {
            if self.up.load(Ordering::SeqCst) {
                Ok(HealthCheckResult::healthy())
            } else {
                Ok(HealthCheckResult::unhealthy("down"))
            }
        }
    }

    fn config(fallbacks: &[&str]) -> FailoverConfig {
        FailoverConfig {
            enabled: true,
            primary_provider: "a".into(),
            fallback_providers: fallbacks.iter().map(|s| s.to_string()).collect(),
            strategy: FailoverStrategy {
                max_failures: 3,
                backoff_base_ms: 1_000,
                backoff_multiplier: 2.0,
                max_backoff_ms: 8_000,
                recovery_threshold: 2,
                ..Default::default()
            },
            circuit_breaker: CircuitBreakerConfig {
                enabled: true,
                failure_threshold: 5,
                reset_timeout_ms: 60_000,
            },
            recovery_sweep_interval_ms: 1_000,
        }
    }

    fn manager(providers: &[Arc<Switch>], config: FailoverConfig) -> (FailoverManager, Arc<ManualClock>) {
        let mut registry = ProviderRegistry::new();
        for p in providers {
            registry.register(p.clone());
        }
        let clock = Arc::new(ManualClock::new(1_000_000));
        (FailoverManager::with_clock(config, registry, clock.clone()), clock)
    }

    fn request() -> ProviderRequest {
        ProviderRequest::new(serde_json::json!({ "prompt": "ping" }))
    }

    #[tokio::test]
    async fn test_primary_serves_when_healthy() {
        let a = Switch::new("a", true);
        let b = Switch::new("b", true);
        let (manager, _) = manager(&[a.clone(), b.clone()], config(&["b"]));

        let result = manager.execute_with_failover(&request()).await.unwrap();
        assert_eq!(result.provider, "a");
        assert!(!result.failover_occurred);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.response["from"], "a");
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_last_candidate_succeeds() {
        let a = Switch::new("a", false);
        let b = Switch::new("b", false);
        let c = Switch::new("c", true);
        let (manager, _) = manager(&[a.clone(), b.clone(), c.clone()], config(&["b", "c"]));

        let result = manager.execute_with_failover(&request()).await.unwrap();
        assert_eq!(result.provider, "c");
        assert!(result.failover_occurred);
        assert_eq!(result.attempts, 3);
        for p in [&a, &b, &c] {
            assert_eq!(p.calls.load(Ordering::SeqCst), 1, "{} attempted once", p.name);
        }
        assert_eq!(manager.get_provider_state("a").unwrap().consecutive_failures, 1);
        assert_eq!(manager.get_provider_state("c").unwrap().successful_requests, 1);
    }

    #[tokio::test]
    async fn test_all_fail() {
        let a = Switch::new("a", false);
        let b = Switch::new("b", false);
        let (manager, _) = manager(&[a.clone(), b.clone()], config(&["b"]));

        let err = manager.execute_with_failover(&request()).await.unwrap_err();
        let FailoverError::AllProvidersExhausted { attempts, last_error } = err;
        assert_eq!(attempts, 2);
        assert!(last_error.contains("b down"));

        for name in ["a", "b"] {
            let state = manager.get_provider_state(name).unwrap();
            assert_eq!(state.total_requests, 1);
            assert_eq!(state.consecutive_failures, 1);
        }
    }

    #[tokio::test]
    async fn test_no_eligible_candidates() {
        let a = Switch::new("a", false);
        let (manager, _) = manager(&[a.clone()], config(&[]));

        assert!(manager.execute_with_failover(&request()).await.is_err());
        let err = manager.execute_with_failover(&request()).await.unwrap_err();
        assert_eq!(err, FailoverError::no_eligible_providers());
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_primary_deactivation_routes_to_fallback() {
        let a = Switch::new("a", false);
        let b = Switch::new("b", true);
        let (manager, clock) = manager(&[a.clone(), b.clone()], config(&["b"]));

        for _ in 0..3 {
            manager.execute_with_failover(&request()).await.unwrap();
            clock.advance(8_000);
        }
        let state = manager.get_provider_state("a").unwrap();
        assert!(!state.is_active);
        assert!(!state.circuit_breaker_open);
        assert_eq!(manager.current_provider(), "a");

        let result = manager.execute_with_failover(&request()).await.unwrap();
        assert_eq!(result.provider, "b");
        assert!(result.failover_occurred);

        let failovers: Vec<_> = manager
            .get_failover_events()
            .into_iter()
            .filter(|e| e.event_type == FailoverEventType::Failover)
            .collect();
        assert_eq!(failovers.len(), 1);
        assert_eq!(failovers[0].from_provider.as_deref(), Some("a"));
        assert_eq!(failovers[0].to_provider.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_circuit_opens_and_resets_lazily() {
        let a = Switch::new("a", false);
        let b = Switch::new("b", true);
        let (manager, clock) = manager(&[a.clone(), b.clone()], config(&["b"]));

        for _ in 0..5 {
            manager.execute_with_failover(&request()).await.unwrap();
            clock.advance(8_000);
        }
        let opened_at = manager.get_provider_state("a").unwrap().last_circuit_breaker_reset;
        assert!(manager.get_provider_state("a").unwrap().circuit_breaker_open);

        clock.set(opened_at + 59_999);
        assert_eq!(manager.build_candidates(), vec!["b"]);

        clock.set(opened_at + 60_000);
        assert_eq!(manager.build_candidates(), vec!["a", "b"]);

        let types: Vec<_> = manager.get_failover_events().iter().map(|e| e.event_type).collect();
        assert!(types.contains(&FailoverEventType::CircuitBreakerOpen));
        assert_eq!(types.last(), Some(&FailoverEventType::CircuitBreakerClosed));

        // Half-open probe fails: circuit reopens at once.
        manager.execute_with_failover(&request()).await.unwrap();
        assert!(manager.get_provider_state("a").unwrap().circuit_breaker_open);
    }

    #[tokio::test]
    async fn test_recovery_restores_primary() {
        let a = Switch::new("a", false);
        let b = Switch::new("b", true);
        let (manager, clock) = manager(&[a.clone(), b.clone()], config(&["b"]));

        for _ in 0..3 {
            manager.execute_with_failover(&request()).await.unwrap();
            clock.advance(8_000);
        }
        assert!(manager.manual_failover("b"));
        assert_eq!(manager.current_provider(), "b");

        a.set(true);
        let first = manager.execute_with_failover(&request()).await.unwrap();
        assert_eq!(first.provider, "a");
        assert!(first.failover_occurred);
        assert!(!manager.get_provider_state("a").unwrap().is_active);

        manager.execute_with_failover(&request()).await.unwrap();
        assert!(manager.get_provider_state("a").unwrap().is_active);
        assert_eq!(manager.current_provider(), "a");

        let last = manager.get_failover_events().pop().unwrap();
        assert_eq!(last.event_type, FailoverEventType::Recovery);
        assert_eq!(last.from_provider.as_deref(), Some("b"));
        assert_eq!(last.to_provider.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_manual_failover_requires_eligibility() {
        let a = Switch::new("a", true);
        let b = Switch::new("b", true);
        let (manager, _) = manager(&[a.clone(), b.clone()], config(&["b"]));

        manager.record_failure("b");
        let before = manager.get_failover_events().len();
        assert!(!manager.manual_failover("b"));
        assert!(!manager.manual_failover("unknown"));
        assert_eq!(manager.get_failover_events().len(), before);
        assert_eq!(manager.current_provider(), "a");

        manager.record_success("b");
        assert!(manager.manual_failover("b"));
        let event = manager.get_failover_events().pop().unwrap();
        assert_eq!(event.reason, "manual_failover");
        assert_eq!(event.from_provider.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_reset_circuit_breakers() {
        let a = Switch::new("a", true);
        let b = Switch::new("b", true);
        let (manager, _) = manager(&[a, b], config(&["b"]));

        for _ in 0..5 {
            manager.record_failure("a");
        }
        assert!(manager.get_provider_state("a").unwrap().circuit_breaker_open);

        manager.reset_circuit_breakers();
        assert!(manager.get_provider_states().iter().all(|s| !s.circuit_breaker_open));
        let closes = manager
            .get_failover_events()
            .iter()
            .filter(|e| e.event_type == FailoverEventType::CircuitBreakerClosed)
            .count();
        assert_eq!(closes, 2);
    }

    #[tokio::test]
    async fn test_disabled_failover_uses_current_only() {
        let a = Switch::new("a", false);
        let b = Switch::new("b", true);
        let mut cfg = config(&["b"]);
        cfg.enabled = false;
        let (manager, _) = manager(&[a.clone(), b.clone()], cfg);

        let err = manager.execute_with_failover(&request()).await.unwrap_err();
        assert!(matches!(err, FailoverError::AllProvidersExhausted { attempts: 1, .. }));
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ordered_mode_keeps_configured_order() {
        let providers: Vec<_> = ["a", "b", "c", "d"].iter().map(|n| Switch::new(n, true)).collect();
        let mut cfg = config(&["d", "c", "b"]);
        cfg.strategy.mode = FailoverMode::Ordered;
        let (manager, _) = manager(&providers, cfg);
        assert_eq!(manager.build_candidates(), vec!["a", "d", "c", "b"]);
    }

    #[tokio::test]
    async fn test_score_weights_reorder_fallbacks() {
        use crate::config::HealthMonitorConfig;
        use crate::failover::ScoreWeights;
        use crate::health::HealthMetric;

        let providers: Vec<_> = ["a", "b", "c"].iter().map(|n| Switch::new(n, true)).collect();
        let mut registry = ProviderRegistry::new();
        for p in &providers {
            registry.register(p.clone());
        }
        let clock = Arc::new(ManualClock::new(1_000_000));
        let monitor = Arc::new(HealthMonitor::with_clock(
            HealthMonitorConfig::default(),
            registry.clone(),
            clock.clone(),
        ));
        let manager = FailoverManager::with_clock(config(&["b", "c"]), registry, clock.clone())
            .with_health_monitor(monitor.clone());

        let metric = |is_healthy: bool, latency: u64| HealthMetric {
            timestamp: clock.now_ms(),
            is_healthy,
            latency,
            error: None,
        };
        // b: always up but slow. c: fast but flaps.
        monitor.record_metric("b", metric(true, 5_000));
        monitor.record_metric("c", metric(true, 10));
        monitor.record_metric("c", metric(false, 10));

        // Defaults: b = 50 + 15 + 20 = 85, c = 25 + 29.97 + 10 = 64.97
        assert_eq!(manager.build_candidates(), vec!["a", "b", "c"]);

        let mut latency_first = config(&["b", "c"]);
        latency_first.strategy.score_weights = ScoreWeights {
            uptime: 0.0,
            latency: 1.0,
            error_rate: 0.0,
            latency_scale_ms: 100.0,
        };
        manager.update_config(latency_first);

        // b = 100 - 50, c = 100 - 0.1
        assert!((manager.health_score("b").unwrap() - 50.0).abs() < 1e-9);
        assert!((manager.health_score("c").unwrap() - 99.9).abs() < 1e-9);
        assert_eq!(manager.build_candidates(), vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn test_update_config_keeps_state() {
        let a = Switch::new("a", true);
        let b = Switch::new("b", true);
        let c = Switch::new("c", true);
        let (manager, _) = manager(&[a, b, c], config(&["b"]));
        manager.record_failure("a");

        manager.update_config(config(&["b", "c"]));
        assert_eq!(manager.get_provider_state("a").unwrap().consecutive_failures, 1);
        assert!(manager.get_provider_state("c").is_some());
        assert_eq!(manager.config().fallback_providers, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_statistics_and_export() {
        let a = Switch::new("a", true);
        let (manager, _) = manager(&[a], config(&[]));
        for _ in 0..4 {
            manager.execute_with_failover(&request()).await.unwrap();
        }
        let stats = manager.get_failover_statistics();
        assert_eq!(stats.current_provider, "a");
        assert_eq!(stats.current_provider_uptime, 100.0);

        let export = manager.export_failover_data();
        assert_eq!(export.states.len(), 1);
        assert!(serde_json::to_value(&export).is_ok());
    }

    #[tokio::test]
    async fn test_subscribe_receives_events() {
        let a = Switch::new("a", true);
        let b = Switch::new("b", true);
        let (manager, _) = manager(&[a, b], config(&["b"]));
        let mut rx = manager.subscribe();

        assert!(manager.manual_failover("b"));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.to_provider.as_deref(), Some("b"));
    }
}
