//! Search-result cache (§4.4): query-fingerprint to ranked-list mapping,
//! two-tier with TTL and an opt-in semantic near-hit fallback.

mod metrics;
mod retrieval;

pub use metrics::CacheMetrics;
pub use retrieval::RetrievalCache;
