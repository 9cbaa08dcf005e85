//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (failover names reference providers)
//! - Validate value ranges (intervals > 0, percentages within 0-100)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Unknown failover provider names are not errors: they degrade to an
//!   always-unhealthy provider at runtime, so they are only logged

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.providers.is_empty() {
        errors.push(ValidationError::new("providers", "at least one provider is required"));
    }

    let mut seen = HashSet::new();
    for (i, provider) in config.providers.iter().enumerate() {
        let field = format!("providers[{}]", i);
        if provider.name.is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        } else if !seen.insert(provider.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate provider name '{}'", provider.name),
            ));
        }
        if let Err(e) = Url::parse(&provider.endpoint) {
            errors.push(ValidationError::new(
                format!("{}.endpoint", field),
                format!("invalid URL '{}': {}", provider.endpoint, e),
            ));
        }
        if provider.timeout_ms == 0 {
            errors.push(ValidationError::new(format!("{}.timeout_ms", field), "must be > 0"));
        }
    }

    let failover = &config.failover;
    if failover.primary_provider.is_empty() {
        errors.push(ValidationError::new("failover.primary_provider", "must not be empty"));
    }
    for name in failover.provider_names() {
        if !seen.contains(name.as_str()) {
            tracing::warn!(provider = %name, "Failover references unknown provider; it will be treated as unhealthy");
        }
    }

    let strategy = &failover.strategy;
    check_percent(&mut errors, "failover.strategy.health_threshold", strategy.health_threshold);
    if strategy.max_failures == 0 {
        errors.push(ValidationError::new("failover.strategy.max_failures", "must be > 0"));
    }
    if strategy.recovery_threshold == 0 {
        errors.push(ValidationError::new("failover.strategy.recovery_threshold", "must be > 0"));
    }
    if !(strategy.backoff_multiplier >= 1.0) {
        errors.push(ValidationError::new("failover.strategy.backoff_multiplier", "must be >= 1.0"));
    }
    let weights = &strategy.score_weights;
    for (field, value) in [
        ("uptime", weights.uptime),
        ("latency", weights.latency),
        ("error_rate", weights.error_rate),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            errors.push(ValidationError::new(
                format!("failover.strategy.score_weights.{}", field),
                "must be a finite number >= 0",
            ));
        }
    }
    if !(weights.latency_scale_ms.is_finite() && weights.latency_scale_ms > 0.0) {
        errors.push(ValidationError::new(
            "failover.strategy.score_weights.latency_scale_ms",
            "must be > 0",
        ));
    }
    if strategy.max_backoff_ms < strategy.backoff_base_ms {
        errors.push(ValidationError::new(
            "failover.strategy.max_backoff_ms",
            "must be >= backoff_base_ms",
        ));
    }

    let breaker = &failover.circuit_breaker;
    if breaker.enabled {
        if breaker.failure_threshold == 0 {
            errors.push(ValidationError::new("failover.circuit_breaker.failure_threshold", "must be > 0"));
        }
        if breaker.reset_timeout_ms == 0 {
            errors.push(ValidationError::new("failover.circuit_breaker.reset_timeout_ms", "must be > 0"));
        }
    }
    if failover.recovery_sweep_interval_ms == 0 {
        errors.push(ValidationError::new("failover.recovery_sweep_interval_ms", "must be > 0"));
    }

    let health = &config.health;
    if health.check_interval_ms == 0 {
        errors.push(ValidationError::new("health.check_interval_ms", "must be > 0"));
    }
    if health.retention_period_ms == 0 {
        errors.push(ValidationError::new("health.retention_period_ms", "must be > 0"));
    }
    if health.statistics_window_ms == 0 {
        errors.push(ValidationError::new("health.statistics_window_ms", "must be > 0"));
    }
    for name in &health.providers {
        if !seen.contains(name.as_str()) {
            errors.push(ValidationError::new(
                "health.providers",
                format!("unknown provider '{}'", name),
            ));
        }
    }

    let alerts = &health.alerts;
    check_percent(&mut errors, "health.alerts.error_rate_threshold", alerts.error_rate_threshold);
    if alerts.latency_threshold_ms < 0.0 {
        errors.push(ValidationError::new("health.alerts.latency_threshold_ms", "must be >= 0"));
    }
    if alerts.enabled && alerts.consecutive_failures == 0 {
        errors.push(ValidationError::new("health.alerts.consecutive_failures", "must be > 0"));
    }
    if let Some(webhook) = &alerts.webhook_url {
        if let Err(e) = Url::parse(webhook) {
            errors.push(ValidationError::new(
                "health.alerts.webhook_url",
                format!("invalid URL '{}': {}", webhook, e),
            ));
        }
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::new("admin.api_key", "must not be empty when admin is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_percent(errors: &mut Vec<ValidationError>, field: &str, value: f64) {
    if !(0.0..=100.0).contains(&value) {
        errors.push(ValidationError::new(field, "must be within 0-100"));
    }
}
