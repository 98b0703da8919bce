//! Errors local to the retrieval cache.

/// Failure modes specific to the two-tier query cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The persisted `search_cache` table could not be read or written.
    #[error("persisted cache unavailable: {0}")]
    BackingStoreUnavailable(String),

    /// A cached row failed to deserialize into a ranked result list.
    #[error("cache entry corrupt: {0}")]
    CorruptEntry(String),

    /// The fingerprint computed for a set of search options could not be
    /// produced (e.g. non-normalisable option value).
    #[error("could not fingerprint search options: {0}")]
    Fingerprint(String),
}

impl CacheError {
    /// Cache failures are always soft: callers fall through to a live query.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        true
    }
}
