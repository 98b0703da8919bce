//! Error taxonomy for the retrieval core.
//!
//! The abstract kinds (`not-found`, `validation`, `storage`, `embedding`,
//! `reranker`, `timeout`, `internal`) map onto the variants below.
//! [`Error::kind`] returns the stable tag a façade boundary would put in
//! its `{is_error, message, kind}` result.

mod cache;
mod storage;

pub use cache::CacheError;
pub use storage::StorageError;

use uuid::Uuid;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type returned by every fallible public operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An entity, observation, or relationship id did not resolve.
    #[error("not found: {0}")]
    NotFound(Uuid),

    /// A boundary validation rule was violated (self-loop, strength range,
    /// dimension mismatch). Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The storage backend failed. See [`Error::is_recoverable`] for
    /// whether the caller may retry or must fall back.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Embedding inference failed. The critical path still returns an
    /// ordered result using a zero vector; this variant surfaces when no
    /// fallback is acceptable (e.g. at index build time).
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Cross-encoder reranker inference failed.
    #[error("reranker error: {0}")]
    Reranker(String),

    /// A deadline attached by the caller elapsed before completion.
    #[error("operation timed out")]
    Timeout,

    /// Query cache operation failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Serialization/deserialization of a stored record failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else: a bug, an invariant violation the caller cannot act on.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable string tag for the abstract error kind, usable as the `kind`
    /// field of a `{is_error, message, kind}` façade result.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not-found",
            Error::Validation(_) => "validation",
            Error::Storage(_) => "storage",
            Error::Embedding(_) => "embedding",
            Error::Reranker(_) => "reranker",
            Error::Timeout => "timeout",
            Error::Cache(_) => "internal",
            Error::Serialization(_) => "internal",
            Error::Internal(_) => "internal",
        }
    }

    /// Whether a caller may reasonably retry the operation unchanged.
    ///
    /// Validation errors are never recoverable; storage errors are
    /// recoverable only on read paths (the hybrid search pipeline falls
    /// back to vector-only rather than retrying).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Validation(_) | Error::NotFound(_) => false,
            Error::Storage(e) => e.is_recoverable(),
            Error::Embedding(_) | Error::Reranker(_) => true,
            Error::Timeout => true,
            Error::Cache(_) => true,
            Error::Serialization(_) | Error::Internal(_) => false,
        }
    }

    /// Construct a validation error rejecting a self-loop relationship.
    #[must_use]
    pub fn self_loop(entity_id: Uuid) -> Self {
        Error::Validation(format!(
            "{}: {entity_id}",
            crate::constants::errors::SELF_LOOP_REJECTED
        ))
    }

    /// Construct a validation error for an out-of-range relationship strength.
    #[must_use]
    pub fn strength_out_of_range(strength: f32) -> Self {
        Error::Validation(format!(
            "{}: got {strength}",
            crate::constants::errors::STRENGTH_OUT_OF_RANGE
        ))
    }

    /// Construct a validation error for an embedding dimension mismatch.
    #[must_use]
    pub fn dimension_mismatch(expected: usize, got: usize) -> Self {
        Error::Validation(format!(
            "{}: expected {expected}, got {got}",
            crate::constants::errors::DIMENSION_MISMATCH
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_never_recoverable() {
        let err = Error::self_loop(Uuid::nil());
        assert_eq!(err.kind(), "validation");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn not_found_is_not_recoverable() {
        let err = Error::NotFound(Uuid::nil());
        assert_eq!(err.kind(), "not-found");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn embedding_failure_is_recoverable() {
        let err = Error::Embedding("model unavailable".into());
        assert_eq!(err.kind(), "embedding");
        assert!(err.is_recoverable());
    }

    #[test]
    fn reranker_failure_is_recoverable() {
        let err = Error::Reranker("batch failed".into());
        assert!(err.is_recoverable());
    }

    #[test]
    fn timeout_is_recoverable() {
        assert!(Error::Timeout.is_recoverable());
    }
}
