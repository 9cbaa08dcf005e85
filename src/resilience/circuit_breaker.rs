//! Per-provider circuit breaker.
//!
//! # States
//! - Closed: provider is a routing candidate
//! - Open: provider excluded until the reset timeout elapses
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Closed: evaluated lazily at candidate selection, once
//!                now - opened_at >= reset_timeout
//! ```
//!
//! There is no explicit half-open state: the first attempt after the lazy
//! close acts as the probe, and a failure reopens the circuit immediately
//! because the failure streak is still above the threshold.

use serde::{Deserialize, Serialize};

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
}

/// Circuit breaker for a single provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    open: bool,
    /// Time the circuit last changed state, epoch ms. 0 if never.
    last_reset_ms: u64,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn state(&self) -> CircuitState {
        if self.open {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    pub fn last_reset_ms(&self) -> u64 {
        self.last_reset_ms
    }

    /// Open the circuit. Returns true if it was closed before.
    pub fn trip(&mut self, now_ms: u64) -> bool {
        let was_closed = !self.open;
        self.open = true;
        self.last_reset_ms = now_ms;
        was_closed
    }

    /// Close the circuit if it has been open for at least `reset_timeout_ms`.
    /// Returns true if the circuit transitioned to closed.
    pub fn try_reset(&mut self, now_ms: u64, reset_timeout_ms: u64) -> bool {
        if self.open && now_ms.saturating_sub(self.last_reset_ms) >= reset_timeout_ms {
            self.open = false;
            self.last_reset_ms = now_ms;
            return true;
        }
        false
    }

    /// Close the circuit unconditionally.
    pub fn force_close(&mut self, now_ms: u64) {
        self.open = false;
        self.last_reset_ms = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_and_lazy_reset() {
        let mut cb = CircuitBreaker::new();
        assert_eq!(cb.state(), CircuitState::Closed);

        assert!(cb.trip(1_000));
        assert!(!cb.trip(1_500));
        assert_eq!(cb.last_reset_ms(), 1_500);

        assert!(!cb.try_reset(61_499, 60_000));
        assert!(cb.is_open());
        assert!(cb.try_reset(61_500, 60_000));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.last_reset_ms(), 61_500);
    }

    #[test]
    fn test_reset_on_closed_is_noop() {
        let mut cb = CircuitBreaker::new();
        assert!(!cb.try_reset(u64::MAX, 0));
    }

    #[test]
    fn test_force_close() {
        let mut cb = CircuitBreaker::new();
        cb.trip(10);
        cb.force_close(20);
        assert!(!cb.is_open());
        assert_eq!(cb.last_reset_ms(), 20);
    }
}
