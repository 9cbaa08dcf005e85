//! Failover statistics derived from the event log.

use serde::{Deserialize, Serialize};

use crate::failover::events::{FailoverEvent, FailoverEventType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverStatistics {
    pub total_events: usize,
    pub failovers: usize,
    pub recoveries: usize,
    pub circuit_breaker_opens: usize,
    pub circuit_breaker_closes: usize,
    pub current_provider: String,
    /// Successful requests of the current provider as a percentage.
    pub current_provider_uptime: f64,
    /// Mean gap between consecutive failover events.
    pub mean_time_to_failover_ms: Option<f64>,
    /// Mean gap between consecutive recovery events.
    pub mean_time_to_recovery_ms: Option<f64>,
}

impl FailoverStatistics {
    /// `events` must be sorted by timestamp.
    pub fn from_events(events: &[FailoverEvent], current_provider: String, current_provider_uptime: f64) -> Self {
        let count = |t: FailoverEventType| events.iter().filter(|e| e.event_type == t).count();

        Self {
            total_events: events.len(),
            failovers: count(FailoverEventType::Failover),
            recoveries: count(FailoverEventType::Recovery),
            circuit_breaker_opens: count(FailoverEventType::CircuitBreakerOpen),
            circuit_breaker_closes: count(FailoverEventType::CircuitBreakerClosed),
            current_provider,
            current_provider_uptime,
            mean_time_to_failover_ms: mean_interval(events, FailoverEventType::Failover),
            mean_time_to_recovery_ms: mean_interval(events, FailoverEventType::Recovery),
        }
    }
}

/// Mean delta between consecutive events of the same type. `None` with fewer than two.
pub fn mean_interval(events: &[FailoverEvent], event_type: FailoverEventType) -> Option<f64> {
    let timestamps: Vec<u64> = events
        .iter()
        .filter(|e| e.event_type == event_type)
        .map(|e| e.timestamp)
        .collect();

    if timestamps.len() < 2 {
        return None;
    }

    let total: u64 = timestamps
        .windows(2)
        .map(|w| w[1].saturating_sub(w[0]))
        .sum();
    Some(total as f64 / (timestamps.len() - 1) as f64)
}
