//! Provider state machine.
//!
//! # States
//! ```text
//!            active × closed ── failures >= max_failures ──▶ inactive × closed
//!                 │                                                │
//!   failures >= failure_threshold                    failures >= failure_threshold
//!                 ▼                                                ▼
//!            active × open                                    inactive × open
//!
//! inactive → active: consecutive successes >= recovery_threshold
//! open → closed:     lazily, once reset_timeout has elapsed
//! ```
//!
//! # Invariants
//! - `consecutive_failures > 0` implies `consecutive_successes == 0` and vice versa
//! - `backoff_until` grows with every consecutive failure and is 0 after a success
//!
//! Callers serialize access per provider; nothing here is thread-safe on its own.

use serde::{Deserialize, Serialize};

use crate::config::{CircuitBreakerConfig, FailoverStrategy};
use crate::resilience::{calculate_backoff, CircuitBreaker, CircuitState};

/// Effects of a recorded failure the manager must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FailureOutcome {
    /// The provider just went from active to inactive.
    pub deactivated: bool,
    /// The circuit just went from closed to open.
    pub circuit_opened: bool,
    pub backoff_until: u64,
}

/// Mutable per-provider routing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderState {
    pub name: String,
    pub is_active: bool,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    /// Epoch ms before which the provider is not a candidate. 0 when clear.
    pub backoff_until: u64,
    pub last_failure_time: u64,
    pub circuit_breaker: CircuitBreaker,
    pub total_requests: u64,
    pub successful_requests: u64,
}

impl ProviderState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_active: true,
            consecutive_failures: 0,
            consecutive_successes: 0,
            backoff_until: 0,
            last_failure_time: 0,
            circuit_breaker: CircuitBreaker::new(),
            total_requests: 0,
            successful_requests: 0,
        }
    }

    pub fn circuit_breaker_open(&self) -> bool {
        self.circuit_breaker.is_open()
    }

    pub fn in_backoff(&self, now_ms: u64) -> bool {
        now_ms < self.backoff_until
    }

    /// Count an attempt. Called before the provider is invoked.
    pub fn begin_attempt(&mut self) {
        self.total_requests += 1;
    }

    /// Apply a successful outcome. Returns true if the provider was reactivated.
    pub fn record_success(&mut self, recovery_threshold: u32) -> bool {
        self.successful_requests += 1;
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;
        self.backoff_until = 0;

        if !self.is_active && self.consecutive_successes >= recovery_threshold {
            self.is_active = true;
            return true;
        }
        false
    }

    /// Apply a failed outcome.
    pub fn record_failure(
        &mut self,
        now_ms: u64,
        strategy: &FailoverStrategy,
        breaker: &CircuitBreakerConfig,
    ) -> FailureOutcome {
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
        self.last_failure_time = now_ms;

        let delay = calculate_backoff(
            self.consecutive_failures,
            strategy.backoff_base_ms,
            strategy.backoff_multiplier,
            strategy.max_backoff_ms,
        );
        // Never shorten a window set by a concurrent failure.
        self.backoff_until = self.backoff_until.max(now_ms.saturating_add(delay.as_millis() as u64));

        let mut outcome = FailureOutcome {
            backoff_until: self.backoff_until,
            ..Default::default()
        };

        if self.is_active && self.consecutive_failures >= strategy.max_failures {
            self.is_active = false;
            outcome.deactivated = true;
        }

        if breaker.enabled && self.consecutive_failures >= breaker.failure_threshold {
            outcome.circuit_opened = self.circuit_breaker.trip(now_ms);
        }

        outcome
    }

    /// Lazily close an expired circuit. Returns true if it closed.
    pub fn refresh_circuit(&mut self, now_ms: u64, reset_timeout_ms: u64) -> bool {
        self.circuit_breaker.try_reset(now_ms, reset_timeout_ms)
    }

    /// Candidate eligibility after the lazy circuit check has run.
    pub fn is_eligible(&self, now_ms: u64) -> bool {
        !self.circuit_breaker_open() && !self.in_backoff(now_ms)
    }

    /// Mark active again after an out-of-band successful probe.
    pub fn promote(&mut self) {
        self.is_active = true;
        self.consecutive_failures = 0;
        self.backoff_until = 0;
    }

    /// Success ratio as a percentage. 0 when no requests were made.
    pub fn uptime(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64 * 100.0
        }
    }

    pub fn snapshot(&self, now_ms: u64) -> ProviderSnapshot {
        ProviderSnapshot {
            name: self.name.clone(),
            is_active: self.is_active,
            consecutive_failures: self.consecutive_failures,
            consecutive_successes: self.consecutive_successes,
            backoff_until: self.backoff_until,
            in_backoff: self.in_backoff(now_ms),
            last_failure_time: self.last_failure_time,
            circuit_state: self.circuit_breaker.state(),
            circuit_breaker_open: self.circuit_breaker_open(),
            last_circuit_breaker_reset: self.circuit_breaker.last_reset_ms(),
            total_requests: self.total_requests,
            successful_requests: self.successful_requests,
            uptime: self.uptime(),
        }
    }
}

/// Point-in-time copy of a provider's state for read APIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub name: String,
    pub is_active: bool,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub backoff_until: u64,
    pub in_backoff: bool,
    pub last_failure_time: u64,
    pub circuit_state: CircuitState,
    pub circuit_breaker_open: bool,
    pub last_circuit_breaker_reset: u64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub uptime: f64,
}
