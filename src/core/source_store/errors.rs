//! Source store error types for classification and handling

use thiserror::Error;

/// Errors surfaced by the source store to its callers.
///
/// Only failures that decide whether a connection can proceed live here;
/// bind history problems are reported through [`BindHistoryError`] and never
/// leave the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceStoreError {
    /// A policy with the same identifier is already active.
    #[error("source store: a policy with identifier {0} is already present")]
    DuplicatePolicy(String),

    /// No active policy matches the identifier (or no policy is stored at all).
    #[error("source store: no {0} policy found")]
    PolicyNotFound(String),

    /// The protected storage has no source left once the blacklist is applied.
    #[error("source store: no eligible source available")]
    NoEligibleSource,

    /// Any other failure reported by the protected storage.
    #[error("source store: storage error: {0}")]
    Storage(String),
}

impl SourceStoreError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        SourceStoreError::Storage(msg.into())
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            SourceStoreError::DuplicatePolicy(_) => "duplicate_policy",
            SourceStoreError::PolicyNotFound(_) => "policy_not_found",
            SourceStoreError::NoEligibleSource => "no_eligible_source",
            SourceStoreError::Storage(_) => "storage",
        }
    }
}

/// Failures of the best-effort bind recording step. Logged, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindHistoryError {
    #[error("lookup of {address} failed: {message}")]
    Resolve { address: String, message: String },

    #[error("no hosts associated with {0} found")]
    NoHosts(String),

    #[error("bind history recording timed out after {0}ms")]
    Timeout(u64),
}

impl BindHistoryError {
    pub fn resolve(address: impl Into<String>, message: impl Into<String>) -> Self {
        BindHistoryError::Resolve {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            BindHistoryError::Resolve { .. } => "resolve",
            BindHistoryError::NoHosts(_) => "no_hosts",
            BindHistoryError::Timeout(_) => "timeout",
        }
    }
}
