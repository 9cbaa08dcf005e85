//! Metrics collection and exposition.
//!
//! # Metrics
//! - `failover_provider_health` (gauge): 1=healthy, 0=unhealthy, per provider
//! - `failover_health_check_latency_ms` (histogram): probe latency
//! - `failover_requests_total` (counter): attempts by provider and outcome
//! - `failover_events_total` (counter): failover log appends by type
//! - `failover_alerts_total` (counter): alerts delivered by provider
//! - `failover_circuit_open` (gauge): 1=open, 0=closed, per provider
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so library users pay nothing
//! - Prometheus exposition is opt-in via `init_metrics`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus exporter"),
    }
}

pub fn record_provider_health(provider: &str, healthy: bool) {
    gauge!("failover_provider_health", "provider" => provider.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_health_check_latency(provider: &str, latency_ms: u64) {
    histogram!("failover_health_check_latency_ms", "provider" => provider.to_string())
        .record(latency_ms as f64);
}

pub fn record_request(provider: &str, outcome: &'static str) {
    counter!("failover_requests_total", "provider" => provider.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_failover_event(event_type: &'static str) {
    counter!("failover_events_total", "type" => event_type).increment(1);
}

pub fn record_alert(provider: &str) {
    counter!("failover_alerts_total", "provider" => provider.to_string()).increment(1);
}

pub fn record_circuit_state(provider: &str, open: bool) {
    gauge!("failover_circuit_open", "provider" => provider.to_string())
        .set(if open { 1.0 } else { 0.0 });
}
