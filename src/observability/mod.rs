//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! HealthMonitor / FailoverManager produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`provider`, `attempt`, ...) on every event
//! - Metrics are cheap and optional

pub mod logging;
pub mod metrics;
