//! Crate-wide configuration.
//!
//! A [`MemoryConfig`] is loaded once at startup from an optional TOML file
//! and environment-variable overrides (§6), then threaded through every
//! component as typed fields rather than read ad hoc from the environment.

use serde::{Deserialize, Serialize};

use crate::constants::{defaults, env};

/// Top-level configuration for an [`crate::engine::AssociativeMemory`] instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Embedding model identifier; determines the embedding dimension.
    pub embedding_model: String,
    /// Cross-encoder reranker model identifier.
    pub reranker_model: String,
    /// Embedding dimension, fixed at first successful load (§4.2).
    pub embedding_dimension: usize,
    /// Embedding cache size (entries).
    pub embedding_cache_size: usize,
    /// Embedding cache TTL, seconds.
    pub embedding_cache_ttl_secs: u64,
    /// In-memory query cache TTL, seconds.
    pub query_cache_ttl_secs: u64,
    /// Persisted query-cache-row TTL, seconds. Independent of (and
    /// normally much longer than) `query_cache_ttl_secs`, since the
    /// persisted tier's job is to serve a hit after the in-memory tier has
    /// evicted an entry or after a restart.
    pub persisted_query_cache_ttl_secs: u64,
    /// Whether the opt-in semantic near-hit cache path is enabled.
    pub semantic_near_hit_enabled: bool,
    /// Semantic near-hit cosine threshold.
    pub semantic_near_hit_threshold: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            embedding_model: "default-embedding-model".to_string(),
            reranker_model: "default-cross-encoder".to_string(),
            embedding_dimension: defaults::DEFAULT_EMBEDDING_DIMENSION,
            embedding_cache_size: defaults::EMBEDDING_CACHE_SIZE,
            embedding_cache_ttl_secs: defaults::EMBEDDING_CACHE_TTL.as_secs(),
            query_cache_ttl_secs: defaults::QUERY_CACHE_TTL.as_secs(),
            persisted_query_cache_ttl_secs: defaults::PERSISTED_QUERY_CACHE_TTL.as_secs(),
            semantic_near_hit_enabled: false,
            semantic_near_hit_threshold: defaults::SEMANTIC_NEAR_HIT_THRESHOLD,
        }
    }
}

impl MemoryConfig {
    /// Parse a TOML configuration document.
    pub fn from_toml(s: &str) -> Result<Self, crate::error::Error> {
        toml::from_str(s).map_err(|e| crate::error::Error::Internal(format!("invalid config: {e}")))
    }

    /// Apply the recognised environment-variable overrides (§6):
    /// `EMBEDDING_MODEL` and `RERANKER_MODEL`.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var(env::EMBEDDING_MODEL) {
            self.embedding_model = v;
        }
        if let Ok(v) = std::env::var(env::RERANKER_MODEL) {
            self.reranker_model = v;
        }
        self
    }
}
