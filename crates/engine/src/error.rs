//! Engine error taxonomy
//!
//! Merge conflicts are deliberately absent: they are returned as structured
//! data from the merge engine, never raised as errors.

use strata_core::StoreError;
use thiserror::Error;

/// Errors surfaced by version engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Entity, version, branch, or tag does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate name, or a write race detected by an optimistic check
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input: unknown enum value, bad reference, empty identifier
    #[error("validation failed: {0}")]
    Validation(String),

    /// Attempted mutation of a locked or current version
    #[error("immutable: {0}")]
    Immutable(String),

    /// Operation cancelled by the caller's token
    #[error("operation cancelled")]
    Cancelled,

    /// Content store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub(crate) fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    pub(crate) fn validation(what: impl Into<String>) -> Self {
        Self::Validation(what.into())
    }

    pub(crate) fn immutable(what: impl Into<String>) -> Self {
        Self::Immutable(what.into())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
