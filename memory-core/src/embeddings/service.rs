//! The embedding service: the orchestrator wrapping an [`EmbeddingProvider`]
//! with the cache, the serialised single-inference queue, and the fail-soft
//! zero-vector policy (§4.2). Every fallback step is logged via `tracing`.

use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, instrument, warn};

use crate::constants::{defaults, logging};

use super::cache::EmbeddingCache;
use super::provider::EmbeddingProvider;

/// The outcome of an embedding request: the vector, and whether it is the
/// fail-soft zero-vector sentinel rather than a real embedding.
#[derive(Debug, Clone)]
pub struct EmbeddingOutcome {
    pub vector: Vec<f32>,
    pub used_zero_vector: bool,
}

/// Orchestrates a single [`EmbeddingProvider`] behind a cache and a
/// serialised inference queue.
///
/// Embedding failures never propagate to callers (§4.2, §7): [`Self::embed`]
/// always returns a vector, falling back to a zero vector of the configured
/// dimension and marking the outcome accordingly.
pub struct EmbeddingService {
    provider: Box<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
    /// Serialises inference so exactly one call runs against the model
    /// graph at a time (§5 "serialised work-queue for the embedding model").
    inference_lock: AsyncMutex<()>,
    dimension: usize,
}

impl EmbeddingService {
    /// Construct a service around `provider`, with the default cache size
    /// and TTL from §4.2.
    #[must_use]
    pub fn new(provider: Box<dyn EmbeddingProvider>) -> Self {
        let dimension = provider.embedding_dimension();
        Self {
            provider,
            cache: EmbeddingCache::new(
                defaults::EMBEDDING_CACHE_SIZE,
                defaults::EMBEDDING_CACHE_TTL,
            ),
            inference_lock: AsyncMutex::new(()),
            dimension,
        }
    }

    /// Construct a service with an explicit cache capacity and TTL.
    #[must_use]
    pub fn with_cache_config(
        provider: Box<dyn EmbeddingProvider>,
        cache_capacity: usize,
        cache_ttl: Duration,
    ) -> Self {
        let dimension = provider.embedding_dimension();
        Self {
            provider,
            cache: EmbeddingCache::new(cache_capacity, cache_ttl),
            inference_lock: AsyncMutex::new(()),
            dimension,
        }
    }

    /// The fixed embedding dimension, immutable after construction per the
    /// §4.2 dimension contract.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed `text`, consulting the cache first. On a provider failure,
    /// logs a warning and returns a zero vector rather than propagating —
    /// callers must still be able to produce an ordered result list.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn embed(&self, text: &str) -> EmbeddingOutcome {
        if let Some(cached) = self.cache.get(text) {
            debug!(prefix = logging::PREFIX_EMBEDDING, "cache hit");
            return EmbeddingOutcome {
                vector: cached,
                used_zero_vector: false,
            };
        }

        // Serialise inference: only one caller runs the model at a time.
        // Cancellation of the outer request does not abort this guard's
        // holder; the computed vector is still cached on completion.
        let _permit = self.inference_lock.lock().await;

        // Re-check the cache: another caller may have populated it while
        // we waited for the inference lock.
        if let Some(cached) = self.cache.get(text) {
            return EmbeddingOutcome {
                vector: cached,
                used_zero_vector: false,
            };
        }

        match self.provider.embed_text(text).await {
            Ok(vector) => {
                self.cache.put(text.to_string(), vector.clone());
                EmbeddingOutcome {
                    vector,
                    used_zero_vector: false,
                }
            }
            Err(err) => {
                warn!(
                    prefix = logging::PREFIX_EMBEDDING,
                    error = %err,
                    "embedding inference failed, returning zero vector"
                );
                EmbeddingOutcome {
                    vector: vec![0.0; self.dimension],
                    used_zero_vector: true,
                }
            }
        }
    }

    /// Embed a batch, preserving order. Never fails as a whole: any
    /// per-item failure degrades that item to a zero vector.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<EmbeddingOutcome> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await);
        }
        out
    }
}
