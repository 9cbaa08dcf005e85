//! Errors surfaced to callers of the failover layer.
//!
//! Provider errors are transient and never escape the manager; they are
//! folded into provider state. The only error a caller of
//! `execute_with_failover` sees is exhaustion of every candidate.

use thiserror::Error;

/// Errors returned by [`crate::failover::FailoverManager`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FailoverError {
    /// Every eligible candidate failed within a single call.
    #[error("All providers failed after {attempts} attempt(s). Last error: {last_error}")]
    AllProvidersExhausted { attempts: u32, last_error: String },
}

impl FailoverError {
    pub(crate) fn no_eligible_providers() -> Self {
        FailoverError::AllProvidersExhausted {
            attempts: 0,
            last_error: "no eligible providers".to_string(),
        }
    }
}

/// Result type for failover operations.
pub type Result<T, E = FailoverError> = std::result::Result<T, E>;
