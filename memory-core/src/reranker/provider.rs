//! The [`RerankerProvider`] trait: cross-encoder scoring of `(query, doc)`
//! pairs, abstracted behind a narrow contract the same way
//! [`crate::embeddings::EmbeddingProvider`] abstracts the embedding model.
//!
//! The same narrow async contract with a `model_name` identifier is reused
//! here, generalised from "text -> vector" to "batch of (query, doc)
//! pairs -> scores".

use async_trait::async_trait;

use crate::error::Result;

/// Scores batches of `(query, document)` pairs with a cross-encoder (§4.3).
#[async_trait]
pub trait RerankerProvider: Send + Sync {
    /// Score every `(query, doc)` pair in `docs`, returning one score per
    /// input document in the same order. Implementations submit the whole
    /// batch as a single inference call.
    async fn score_batch(&self, query: &str, docs: &[String]) -> Result<Vec<f32>>;

    /// Stable model identifier, used in log fields and §6's
    /// `RERANKER_MODEL` environment variable resolution.
    fn model_name(&self) -> &str;
}

/// A deterministic, dependency-free provider used by the crate's own tests:
/// scores a pair by token overlap between `query` and `doc`, so a document
/// sharing more query terms scores higher without needing a real
/// cross-encoder model.
pub struct MockRerankerProvider {
    model_name: String,
}

impl Default for MockRerankerProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRerankerProvider {
    /// Construct a mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            model_name: "mock-cross-encoder".to_string(),
        }
    }
}

#[async_trait]
impl RerankerProvider for MockRerankerProvider {
    async fn score_batch(&self, query: &str, docs: &[String]) -> Result<Vec<f32>> {
        let needle: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Ok(docs
            .iter()
            .map(|doc| {
                if needle.is_empty() {
                    return 0.0;
                }
                let haystack = doc.to_lowercase();
                let matched = needle.iter().filter(|t| haystack.contains(t.as_str())).count();
                matched as f32 / needle.len() as f32
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scores_preserve_order_and_length() {
        let provider = MockRerankerProvider::new();
        let docs = vec![
            "Alice prefers TypeScript".to_string(),
            "Bob likes tea".to_string(),
        ];
        let scores = provider.score_batch("Alice TypeScript", &docs).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores[0] > scores[1]);
    }

    #[tokio::test]
    async fn empty_query_scores_zero() {
        let provider = MockRerankerProvider::new();
        let docs = vec!["anything".to_string()];
        let scores = provider.score_batch("", &docs).await.unwrap();
        assert_eq!(scores, vec![0.0]);
    }
}
