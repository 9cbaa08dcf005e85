//! Composite health score used to rank fallback providers.
//!
//! `0.5 * uptime + 0.3 * max(0, 100 - latency / 100) + 0.2 * max(0, 100 - error_rate)`
//!
//! Each term is clamped to 0-100, so the score is as well.

use serde::{Deserialize, Serialize};

use crate::health::ProviderStatus;

/// Weights of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub uptime: f64,
    pub latency: f64,
    pub error_rate: f64,
    /// Milliseconds of average latency that cost one latency point.
    pub latency_scale_ms: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            uptime: 0.5,
            latency: 0.3,
            error_rate: 0.2,
            latency_scale_ms: 100.0,
        }
    }
}

impl ScoreWeights {
    pub fn score(&self, uptime: f64, average_latency_ms: f64, error_rate: f64) -> f64 {
        let uptime = clamp_percent(uptime);
        let latency = clamp_percent(100.0 - average_latency_ms / self.latency_scale_ms);
        let errors = clamp_percent(100.0 - error_rate);
        clamp_percent(self.uptime * uptime + self.latency * latency + self.error_rate * errors)
    }

    pub fn score_status(&self, status: &ProviderStatus) -> f64 {
        self.score(status.uptime, status.average_latency, status.error_rate)
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
