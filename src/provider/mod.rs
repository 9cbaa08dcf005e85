//! Provider contract.
//!
//! # Data Flow
//! ```text
//! FailoverManager::execute_with_failover
//!     → registry.rs (resolve provider by name)
//!     → Provider::send_request (one attempt per candidate)
//!
//! HealthMonitor timer
//!     → Provider::health_check (one probe per provider, concurrent)
//! ```
//!
//! # Design Decisions
//! - Providers enforce their own timeouts; callers impose none
//! - Every provider error is transient from the caller's point of view
//! - Unknown provider names resolve to an always-failing provider instead
//!   of aborting startup

pub mod http;
pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub use registry::ProviderRegistry;

/// A logical request routed to one provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderRequest {
    /// Correlation id carried through logs.
    pub id: Uuid,
    pub payload: serde_json::Value,
}

impl ProviderRequest {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
        }
    }
}

/// Response returned by a provider.
pub type ProviderResponse = serde_json::Value;

/// Outcome of a provider's own health probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HealthCheckResult {
    pub is_healthy: bool,
    /// Latency reported by the provider, if it measures one.
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl HealthCheckResult {
    pub fn healthy() -> Self {
        Self {
            is_healthy: true,
            ..Default::default()
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            is_healthy: false,
            latency_ms: None,
            error: Some(error.into()),
        }
    }
}

/// Transient errors raised by a provider call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A pluggable backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name under which the provider is registered.
    fn name(&self) -> &str;

    /// Perform one request. Never retried by the callee.
    async fn send_request(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Probe the backend.
    async fn health_check(&self) -> Result<HealthCheckResult, ProviderError>;
}

/// Stand-in for a provider name that could not be resolved.
///
/// It fails every request and every probe so the name stays visible in
/// health data while never receiving traffic successfully.
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    name: String,
}

impl UnavailableProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn error(&self) -> ProviderError {
        ProviderError::Unavailable(format!("provider '{}' is not configured", self.name))
    }
}

#[async_trait]
impl Provider for UnavailableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_request(&self, _request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(self.error())
    }

    async fn health_check(&self) -> Result<HealthCheckResult, ProviderError> {
        Err(self.error())
    }
}
