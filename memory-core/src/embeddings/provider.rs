//! The [`EmbeddingProvider`] trait: tokenizer + transformer inference,
//! abstracted behind a narrow contract so the rest of the crate never
//! depends on a specific model runtime.
//!
//! The contract is deliberately small — `embed_text`/`embedding_dimension`/
//! `model_name` — with no similarity/warmup/metadata surface, since those
//! are façade-level conveniences outside this crate's scope.

use async_trait::async_trait;

use crate::error::Result;
use crate::math::l2_normalize;

/// Turns text into an L2-normalised embedding vector (§4.2).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single string. Implementations perform
    /// tokenize → transformer inference → attention-mask-weighted mean pool
    /// → L2-normalise internally; callers always receive a unit vector (or
    /// the documented fail-soft zero vector — see
    /// [`crate::embeddings::service::EmbeddingService`]).
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of strings in one request where the provider supports
    /// it. The default implementation simply loops, which is correct for
    /// any provider and overridden by providers with true batched inference.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed_text(t).await?);
        }
        Ok(out)
    }

    /// The fixed embedding dimension this provider produces. Immutable
    /// after the provider's first successful embedding, per §4.2's
    /// dimension contract.
    fn embedding_dimension(&self) -> usize;

    /// Stable model identifier, used in log fields and §6's
    /// `EMBEDDING_MODEL` environment variable resolution.
    fn model_name(&self) -> &str;
}

/// A deterministic, dependency-free provider used by the crate's own tests
/// and as a default when no real model is configured. Produces a stable
/// pseudo-embedding from a character-frequency hash, normalised to unit
/// length, so that repeated calls with the same text are identical and
/// semantically similar strings (sharing characters) land closer together
/// than unrelated ones — good enough to exercise ranking logic without a
/// real transformer.
pub struct MockEmbeddingProvider {
    dimension: usize,
    model_name: String,
}

impl MockEmbeddingProvider {
    /// Construct a mock provider producing vectors of `dimension` length.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_name: "mock-embedding-provider".to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dimension];
        if text.is_empty() {
            return Ok(v);
        }
        for (i, byte) in text.as_bytes().iter().enumerate() {
            let slot = (*byte as usize + i) % self.dimension;
            v[slot] += 1.0;
        }
        l2_normalize(&mut v);
        Ok(v)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
