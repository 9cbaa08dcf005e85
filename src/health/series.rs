//! Per-provider health metric series.
//!
//! # Responsibilities
//! - Append one metric per probe
//! - Drop metrics older than the retention period
//! - Derive window statistics and the provider status from the series
//!
//! # Design Decisions
//! - Status is recomputed from the retained series on every probe instead
//!   of being tracked incrementally, so it cannot drift from the data

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetric {
    pub timestamp: u64,
    pub is_healthy: bool,
    /// Milliseconds measured around the probe.
    pub latency: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate over a time window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthStatistics {
    /// Healthy probes as a percentage of all probes.
    pub uptime: f64,
    /// Unhealthy probes as a percentage of all probes.
    pub error_rate: f64,
    pub average_latency: f64,
    pub total_checks: usize,
}

/// Derived health picture of one provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub provider: String,
    pub is_healthy: bool,
    pub error_rate: f64,
    pub average_latency: f64,
    pub uptime: f64,
    pub consecutive_failures: u32,
    pub total_checks: usize,
    pub successful_checks: usize,
    pub last_check: Option<u64>,
    pub last_alert: Option<u64>,
}

/// Time-ordered metrics of one provider.
#[derive(Debug, Clone, Default)]
pub struct MetricSeries {
    metrics: VecDeque<HealthMetric>,
}

impl MetricSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metric: HealthMetric) {
        self.metrics.push_back(metric);
    }

    /// Remove metrics with a timestamp before `cutoff_ms`. Returns how many were dropped.
    pub fn prune_before(&mut self, cutoff_ms: u64) -> usize {
        let before = self.metrics.len();
        self.metrics.retain(|m| m.timestamp >= cutoff_ms);
        before - self.metrics.len()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Copies of metrics at or after `since_ms`.
    pub fn since(&self, since_ms: u64) -> Vec<HealthMetric> {
        self.metrics
            .iter()
            .filter(|m| m.timestamp >= since_ms)
            .cloned()
            .collect()
    }

    /// Statistics over metrics at or after `since_ms`.
    pub fn statistics(&self, since_ms: u64) -> HealthStatistics {
        compute_statistics(self.metrics.iter().filter(|m| m.timestamp >= since_ms))
    }

    /// Status over the whole retained series.
    pub fn status(&self, provider: &str, last_alert: Option<u64>) -> ProviderStatus {
        let stats = compute_statistics(self.metrics.iter());
        let consecutive_failures = self
            .metrics
            .iter()
            .rev()
            .take_while(|m| !m.is_healthy)
            .count() as u32;
        let last = self.metrics.back();

        ProviderStatus {
            provider: provider.to_string(),
            is_healthy: last.map(|m| m.is_healthy).unwrap_or(false),
            error_rate: stats.error_rate,
            average_latency: stats.average_latency,
            uptime: stats.uptime,
            consecutive_failures,
            total_checks: stats.total_checks,
            successful_checks: self.metrics.iter().filter(|m| m.is_healthy).count(),
            last_check: last.map(|m| m.timestamp),
            last_alert,
        }
    }
}

fn compute_statistics<'a>(metrics: impl Iterator<Item = &'a HealthMetric>) -> HealthStatistics {
    let mut total = 0usize;
    let mut healthy = 0usize;
    let mut latency_sum = 0u128;

    for m in metrics {
        total += 1;
        if m.is_healthy {
            healthy += 1;
        }
        latency_sum += m.latency as u128;
    }

    if total == 0 {
        return HealthStatistics::default();
    }

    let total_f = total as f64;
    HealthStatistics {
        uptime: healthy as f64 / total_f * 100.0,
        error_rate: (total - healthy) as f64 / total_f * 100.0,
        average_latency: latency_sum as f64 / total_f,
        total_checks: total,
    }
}
