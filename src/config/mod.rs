//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → FailoverConfig / HealthMonitorConfig handed to their owners
//!
//! On reload (file change or SIGHUP):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → FailoverManager::update_config / HealthMonitor::update_config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::AppConfig;
pub use schema::AlertConfig;
pub use schema::CircuitBreakerConfig;
pub use schema::FailoverConfig;
pub use schema::FailoverMode;
pub use schema::FailoverStrategy;
pub use schema::HealthMonitorConfig;
pub use schema::ProviderConfig;
pub use schema::AdminConfig;
pub use schema::ObservabilityConfig;
