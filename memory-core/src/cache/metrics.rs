//! Cache performance metrics: hits/misses/evictions/size/capacity, plus
//! `hit_rate()` and `is_effective()` for a quick health check without
//! walking the raw counters.

use serde::{Deserialize, Serialize};

/// Cache hit/miss/eviction counters for monitoring the retrieval cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMetrics {
    /// Total in-memory or persisted hits (including semantic near-hits).
    pub hits: u64,
    /// Total misses (nothing found in either tier).
    pub misses: u64,
    /// Entries dropped for exceeding the in-memory TTL or LRU capacity.
    pub evictions: u64,
    /// Near-hits served via the opt-in semantic fallback path.
    pub semantic_near_hits: u64,
}

impl CacheMetrics {
    /// Fraction of lookups that were satisfied from cache, `0.0` if no
    /// lookups have occurred yet.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
