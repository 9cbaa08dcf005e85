//! Failover subsystem.
//!
//! # Data Flow
//! ```text
//! execute_with_failover
//!     → build_candidates (lazy circuit reset, eligibility, ordering)
//!     → Provider::send_request, one candidate at a time
//!     → state.rs (streaks, backoff, activation, circuit)
//!     → events.rs (bounded event log)
//! ```
//!
//! Recovery of the primary happens two ways: enough consecutive request
//! successes, or a sweep that probes it once its health score clears the
//! configured threshold.

pub mod events;
pub mod manager;
pub mod score;
pub mod state;
pub mod stats;

pub use events::{EventLog, FailoverEvent, FailoverEventType, EVENT_LOG_CAPACITY};
pub use manager::{FailoverExport, FailoverManager, FailoverResult};
pub use score::ScoreWeights;
pub use state::{ProviderSnapshot, ProviderState};
pub use stats::FailoverStatistics;
