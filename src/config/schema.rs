//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the failover
//! daemon. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::failover::ScoreWeights;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Provider definitions, resolved by name through the registry.
    pub providers: Vec<ProviderConfig>,

    /// Failover and circuit breaker settings.
    pub failover: FailoverConfig,

    /// Health probing and alerting settings.
    pub health: HealthMonitorConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Provider kind.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// JSON over HTTP.
    #[default]
    Http,
}

/// A single provider definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProviderConfig {
    /// Unique provider name.
    pub name: String,

    #[serde(default)]
    pub kind: ProviderKind,

    /// Inference endpoint (e.g., "http://127.0.0.1:11434/v1/chat").
    pub endpoint: String,

    /// Path probed by `health_check`, relative to the endpoint origin.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Per-call timeout enforced by the provider itself.
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,

    /// Optional bearer token sent with every call.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_provider_timeout_ms() -> u64 {
    30_000
}

/// How fallback providers are ordered behind the primary.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailoverMode {
    /// Fallbacks ranked by health score; configured order breaks ties.
    #[default]
    Priority,
    /// Fallbacks strictly in configured order.
    Ordered,
}

/// Failover configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FailoverConfig {
    /// Enable failover. When disabled only the current provider is tried.
    pub enabled: bool,

    /// Preferred provider. Always first among eligible candidates.
    pub primary_provider: String,

    /// Fallback providers.
    pub fallback_providers: Vec<String>,

    pub strategy: FailoverStrategy,

    pub circuit_breaker: CircuitBreakerConfig,

    /// Interval of the background recovery sweep in milliseconds.
    pub recovery_sweep_interval_ms: u64,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            primary_provider: String::new(),
            fallback_providers: Vec::new(),
            strategy: FailoverStrategy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            recovery_sweep_interval_ms: 60_000,
        }
    }
}

impl FailoverConfig {
    /// Primary followed by fallbacks, without duplicates.
    pub fn provider_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(1 + self.fallback_providers.len());
        for name in std::iter::once(&self.primary_provider).chain(&self.fallback_providers) {
            if !name.is_empty() && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Failover strategy tuning.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FailoverStrategy {
    pub mode: FailoverMode,

    /// Minimum health score (0-100) an inactive primary needs before the
    /// recovery sweep probes it.
    pub health_threshold: f64,

    /// Consecutive failures before a provider is marked inactive.
    pub max_failures: u32,

    /// Base backoff delay in milliseconds.
    pub backoff_base_ms: u64,

    /// Growth factor applied per consecutive failure.
    pub backoff_multiplier: f64,

    /// Upper bound on the backoff delay in milliseconds.
    pub max_backoff_ms: u64,

    /// Consecutive successes before an inactive provider is reactivated.
    pub recovery_threshold: u32,

    /// Weights of the composite health score used for ranking and recovery.
    pub score_weights: ScoreWeights,
}

impl Default for FailoverStrategy {
    fn default() -> Self {
        Self {
            mode: FailoverMode::Priority,
            health_threshold: 80.0,
            max_failures: 3,
            backoff_base_ms: 1_000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
            recovery_threshold: 2,
            score_weights: ScoreWeights::default(),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,

    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Time an open circuit stays open, in milliseconds.
    pub reset_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            reset_timeout_ms: 60_000,
        }
    }
}

/// Health monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthMonitorConfig {
    /// Probe interval in milliseconds.
    pub check_interval_ms: u64,

    /// Metrics older than this are dropped, in milliseconds.
    pub retention_period_ms: u64,

    /// Window used for alert error-rate and latency evaluation.
    pub statistics_window_ms: u64,

    /// Providers to probe. Empty means every configured provider.
    pub providers: Vec<String>,

    pub alerts: AlertConfig,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 30_000,
            retention_period_ms: 24 * 60 * 60 * 1000,
            statistics_window_ms: 5 * 60 * 1000,
            providers: Vec::new(),
            alerts: AlertConfig::default(),
        }
    }
}

/// Alerting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,

    /// Error rate percentage (0-100) above which an alert fires.
    pub error_rate_threshold: f64,

    /// Average latency in milliseconds above which an alert fires.
    pub latency_threshold_ms: f64,

    /// Consecutive failed probes that fire an alert.
    pub consecutive_failures: u32,

    /// Minimum time between two alerts for the same provider.
    pub cooldown_period_ms: u64,

    /// Optional webhook receiving a JSON POST per alert.
    pub webhook_url: Option<String>,

    /// Emit a local notification for every alert.
    #[serde(alias = "email_enabled")]
    pub local_notifications: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            error_rate_threshold: 10.0,
            latency_threshold_ms: 5_000.0,
            consecutive_failures: 3,
            cooldown_period_ms: 15 * 60 * 1000,
            webhook_url: None,
            local_notifications: false,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
