//! Health monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (monitor.rs)
//!     → Provider::health_check for every provider, concurrently
//!     → series.rs (append metric, recompute status)
//!     → alerts.rs (evaluate triggers, cooldown, deliver)
//!     → prune metrics past retention
//! ```
//!
//! # Design Decisions
//! - Runs independently of request traffic
//! - A failing or slow provider never blocks probing of the others
//! - Read APIs return copies, never live references

pub mod alerts;
pub mod monitor;
pub mod series;

pub use alerts::{AlertTrigger, HealthAlert};
pub use monitor::{HealthExport, HealthMonitor};
pub use series::{HealthMetric, HealthStatistics, ProviderStatus};
