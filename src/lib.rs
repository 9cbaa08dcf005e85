//! Provider failover and health monitoring.
//!
//! Routes requests across interchangeable providers with automatic
//! failover, per-provider backoff and circuit breaking, and background
//! health probing with alerting.

pub mod admin;
pub mod clock;
pub mod config;
pub mod error;
pub mod failover;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod provider;
pub mod resilience;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::{FailoverError, Result};
pub use failover::{FailoverEvent, FailoverEventType, FailoverManager, FailoverResult};
pub use health::{HealthAlert, HealthMonitor, ProviderStatus};
pub use lifecycle::Shutdown;
pub use provider::{HealthCheckResult, Provider, ProviderError, ProviderRegistry, ProviderRequest};
