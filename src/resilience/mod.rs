//! Resilience primitives.
//!
//! # Data Flow
//! ```text
//! Provider attempt fails:
//!     → backoff.rs (how long the provider sits out)
//!     → circuit_breaker.rs (open circuit once the failure streak is long enough)
//!
//! Candidate selection:
//!     → circuit_breaker.rs (lazy Open → Closed after reset timeout)
//! ```
//!
//! # Design Decisions
//! - Pure state, no timers: every transition takes `now` explicitly
//! - Circuit breaker and backoff are per provider, owned by `ProviderState`
//! - Timeouts are the provider's responsibility, not enforced here

pub mod backoff;
pub mod circuit_breaker;

pub use backoff::calculate_backoff;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
