//! Capped exponential backoff.
//!
//! No jitter is applied: the delay is a pure function of the failure count,
//! so `backoff_until` is non-decreasing across consecutive failures.

use std::time::Duration;

/// Backoff delay after `consecutive_failures` failures.
///
/// `min(max_ms, base_ms * multiplier^(consecutive_failures - 1))`, and zero
/// when there has been no failure.
pub fn calculate_backoff(consecutive_failures: u32, base_ms: u64, multiplier: f64, max_ms: u64) -> Duration {
    if consecutive_failures == 0 {
        return Duration::from_millis(0);
    }

    let exponent = consecutive_failures.saturating_sub(1).min(i32::MAX as u32) as i32;
    let delay = base_ms as f64 * multiplier.max(1.0).powi(exponent);
    let capped = if delay.is_finite() {
        delay.min(max_ms as f64)
    } else {
        max_ms as f64
    };

    Duration::from_millis(capped as u64)
}
