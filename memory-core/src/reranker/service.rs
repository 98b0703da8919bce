//! The reranker service: orchestrates a [`RerankerProvider`] with the §7
//! degrade-silently-on-failure policy (§4.3, §7).

use tracing::{instrument, warn};

use crate::constants::logging;
use crate::error::Result;

use super::provider::RerankerProvider;

/// A single reranked document: its original index into the input slice and
/// its cross-encoder score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankedItem {
    /// Index into the `docs` slice passed to [`RerankerService::rerank`].
    pub index: usize,
    /// Cross-encoder score, or a neutral `0.5` if the provider failed.
    pub score: f32,
}

/// Orchestrates a single [`RerankerProvider`]. [`Self::rerank`] never fails:
/// on provider error it degrades to the input order with neutral scores,
/// per §4.3 and §7's reranker propagation policy.
pub struct RerankerService {
    provider: Box<dyn RerankerProvider>,
}

impl RerankerService {
    /// Construct a service around `provider`.
    #[must_use]
    pub fn new(provider: Box<dyn RerankerProvider>) -> Self {
        Self { provider }
    }

    /// Score every `(query, doc)` pair and return `(index, score)` sorted
    /// descending by score, the same length as `docs`.
    #[instrument(skip(self, query, docs), fields(query_len = query.len(), n = docs.len()))]
    pub async fn rerank(&self, query: &str, docs: &[String]) -> Vec<RerankedItem> {
        let scores = match self.provider.score_batch(query, docs).await {
            Ok(scores) if scores.len() == docs.len() => scores,
            Ok(_) => {
                warn!(
                    prefix = logging::PREFIX_RERANKER,
                    "provider returned a mismatched batch length, degrading to input order"
                );
                return Self::neutral_order(docs.len());
            }
            Err(err) => {
                warn!(
                    prefix = logging::PREFIX_RERANKER,
                    error = %err,
                    "reranker inference failed, degrading to input order"
                );
                return Self::neutral_order(docs.len());
            }
        };

        let mut items: Vec<RerankedItem> = scores
            .into_iter()
            .enumerate()
            .map(|(index, score)| RerankedItem { index, score })
            .collect();
        items.sort_by(|a, b| b.score.total_cmp(&a.score));
        items
    }

    /// The pre-rerank order with a neutral score, used on every failure path.
    fn neutral_order(n: usize) -> Vec<RerankedItem> {
        (0..n)
            .map(|index| RerankedItem { index, score: 0.5 })
            .collect()
    }

    /// Returns a [`Result`]-wrapped call for callers that want to
    /// distinguish "never fails" from "explicitly surfaced a reranker
    /// error" at a layer above this service (none currently do: §7 mandates
    /// silent degradation at this boundary).
    pub async fn try_rerank(&self, query: &str, docs: &[String]) -> Result<Vec<RerankedItem>> {
        Ok(self.rerank(query, docs).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reranker::provider::MockRerankerProvider;
    use async_trait::async_trait;

    #[tokio::test]
    async fn reranks_descending_by_score() {
        let service = RerankerService::new(Box::new(MockRerankerProvider::new()));
        let docs = vec![
            "Bob likes tea".to_string(),
            "Alice prefers TypeScript".to_string(),
        ];
        let items = service.rerank("Alice TypeScript", &docs).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].index, 1);
        assert!(items[0].score >= items[1].score);
    }

    struct FailingReranker;

    #[async_trait]
    impl RerankerProvider for FailingReranker {
        async fn score_batch(&self, _query: &str, _docs: &[String]) -> Result<Vec<f32>> {
            Err(crate::error::Error::Reranker("boom".to_string()))
        }
        fn model_name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn failure_degrades_to_neutral_input_order() {
        let service = RerankerService::new(Box::new(FailingReranker));
        let docs = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let items = service.rerank("q", &docs).await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].index, 0);
        assert_eq!(items[1].index, 1);
        assert_eq!(items[2].index, 2);
        assert!(items.iter().all(|it| (it.score - 0.5).abs() < 1e-6));
    }
}
