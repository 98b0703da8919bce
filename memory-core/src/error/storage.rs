//! Errors local to the storage binding.

/// Failure modes surfaced by a [`crate::storage::StorageBackend`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be reached (connection, lock contention).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A transaction was rolled back because one of its writes failed
    /// validation or execution.
    #[error("transaction rolled back: {0}")]
    TransactionRolledBack(String),

    /// A query program was malformed or referenced an unknown relation.
    #[error("invalid query program: {0}")]
    InvalidProgram(String),

    /// An index (HNSW or full-text) required by the query is missing or
    /// built against a different embedding dimension.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
}

impl StorageError {
    /// Whether the read path that produced this error should fall back to a
    /// degraded vector-only search rather than propagate.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable(_) | StorageError::IndexUnavailable(_)
        )
    }
}
