//! Error kinds shared by every stage of the clause pipeline.
//!
//! Per-edit problems (an empty target, a target missing from the document,
//! a snippet that no longer matches) are *not* errors: they are reported as
//! [`Rejection`](crate::models::Rejection)s and
//! [`ReconciliationFailure`](crate::models::ReconciliationFailure)s next to
//! the edits that did succeed. A [`ClauseError`] aborts the whole operation.

use thiserror::Error;

/// Failure of a whole operation.
#[derive(Debug, Error)]
pub enum ClauseError {
    /// Malformed or missing request data (empty instruction, empty document).
    #[error("invalid input: {0}")]
    Input(String),

    /// A referenced document or item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The embedding or completion service failed or hit a quota.
    /// The operation performed no mutation and may be retried by the caller.
    #[error("external service failed: {0}")]
    TransientExternal(String),

    /// The external service did not answer within the configured timeout.
    /// Retryable, like [`ClauseError::TransientExternal`].
    #[error("external service timed out: {0}")]
    Timeout(String),

    /// The external service refused the request itself (bad key, oversized
    /// input). Retrying the same request will fail again.
    #[error("external service rejected the request: {0}")]
    Rejected(String),

    /// An external proposal did not have the expected shape.
    #[error("invalid proposal: {0}")]
    Validation(String),

    /// A verified edit no longer matches the document it targets.
    #[error("reconciliation failed: {0}")]
    Reconciliation(String),

    /// Misconfiguration, e.g. a vector whose dimension differs from the index.
    #[error("configuration error: {0}")]
    Config(String),

    /// The embedding or completion provider is switched off in configuration.
    #[error("{0}")]
    ProviderDisabled(String),

    /// Opaque failure from a persistent store.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ClauseError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClauseError::TransientExternal(_) | ClauseError::Timeout(_)
        )
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ClauseError::Input(_) => "input",
            ClauseError::NotFound(_) => "not_found",
            ClauseError::TransientExternal(_) => "transient_external",
            ClauseError::Timeout(_) => "timeout",
            ClauseError::Rejected(_) => "rejected",
            ClauseError::Validation(_) => "validation",
            ClauseError::Reconciliation(_) => "reconciliation",
            ClauseError::Config(_) => "config",
            ClauseError::ProviderDisabled(_) => "provider_disabled",
            ClauseError::Storage(_) => "storage",
        }
    }
}

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, ClauseError>;
