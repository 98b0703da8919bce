//! The top-level façade: [`AssociativeMemory`] wires storage, embeddings,
//! reranker, cache, and the retrieval algorithms together behind the
//! operations §6 names.
//!
//! A single struct holds every component, constructed via `new`, with
//! builder-style setters (`with_adaptive_options`) for overriding defaults
//! without a separate config-builder type.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::adaptive;
use crate::cache::RetrievalCache;
use crate::config::MemoryConfig;
use crate::embeddings::EmbeddingService;
use crate::error::{Error, Result};
use crate::graph_rag;
use crate::logical_edges::{self, LogicalEdge};
use crate::multihop::{self, MultiHopResult};
use crate::reranker::RerankerService;
use crate::search::hybrid;
use crate::storage::{StorageBackend, WriteOp};
use crate::temporal::{self, TemporalEmbedding};
use crate::types::{AdaptiveOptions, Entity, MultiHopOptions, Observation, Relationship, SearchOptions, SearchResult, StrategyName};

/// The associative memory engine: the single entry point that every adapter
/// (tool-call façade, test harness) talks to.
pub struct AssociativeMemory {
    storage: Arc<dyn StorageBackend>,
    embeddings: EmbeddingService,
    reranker: RerankerService,
    cache: RetrievalCache,
    config: MemoryConfig,
    adaptive_options: AdaptiveOptions,
}

impl AssociativeMemory {
    /// Wire up a memory engine from its component services.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        embeddings: EmbeddingService,
        reranker: RerankerService,
        config: MemoryConfig,
    ) -> Self {
        let cache = RetrievalCache::with_config_and_persisted_ttl(
            std::time::Duration::from_secs(config.query_cache_ttl_secs),
            std::time::Duration::from_secs(config.persisted_query_cache_ttl_secs),
            config.semantic_near_hit_enabled,
            config.semantic_near_hit_threshold,
        );
        Self {
            storage,
            embeddings,
            reranker,
            cache,
            config,
            adaptive_options: AdaptiveOptions::default(),
        }
    }

    /// Override the default adaptive-selector options (exploration rate,
    /// PRA/CAF shaping), e.g. to disable exploration in tests.
    #[must_use]
    pub fn with_adaptive_options(mut self, options: AdaptiveOptions) -> Self {
        self.adaptive_options = options;
        self
    }

    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    // --- Mutation: remember / observe / relate / retract (§6 `memory.*`) ---

    /// Assert a new entity, embedding its content and name.
    pub async fn remember_entity(&self, name: &str, kind: &str, now: DateTime<Utc>) -> Result<Uuid> {
        let mut entity = Entity::new(name, kind, now);
        let content_outcome = self.embeddings.embed(&entity.content_text()).await;
        let name_outcome = self.embeddings.embed(&entity.name).await;
        entity.content_embedding = Some(content_outcome.vector);
        entity.name_embedding = Some(name_outcome.vector);
        let id = entity.id;
        self.storage.transaction(vec![WriteOp::PutEntity(entity)], now).await?;
        Ok(id)
    }

    /// Retract an entity as of `at` (bi-temporal delete, §4.1).
    pub async fn retract_entity(&self, entity_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.storage
            .transaction(vec![WriteOp::RetractEntity { id: entity_id, at }], at)
            .await
    }

    /// Record an observation against `entity_id`, embedding its text.
    pub async fn observe(&self, entity_id: Uuid, text: &str, now: DateTime<Utc>) -> Result<Uuid> {
        if self.storage.get_entity(entity_id).await?.is_none() {
            return Err(Error::NotFound(entity_id));
        }
        let mut observation = Observation::new(entity_id, text, now);
        let outcome = self.embeddings.embed(text).await;
        observation.text_embedding = Some(outcome.vector);
        let id = observation.id;
        self.storage
            .transaction(vec![WriteOp::PutObservation(observation)], now)
            .await?;
        Ok(id)
    }

    /// Retract an observation as of `at`.
    pub async fn retract_observation(&self, observation_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.storage
            .transaction(vec![WriteOp::RetractObservation { id: observation_id, at }], at)
            .await
    }

    /// Assert a relationship between two existing entities.
    pub async fn relate(
        &self,
        from_id: Uuid,
        to_id: Uuid,
        relation_type: &str,
        strength: f32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let relationship = Relationship::new(from_id, to_id, relation_type, strength, now)?;
        self.storage.transaction(vec![WriteOp::PutRelationship(relationship)], now).await
    }

    /// Retract a relationship as of `at`.
    pub async fn retract_relationship(
        &self,
        from_id: Uuid,
        to_id: Uuid,
        relation_type: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.storage
            .transaction(
                vec![WriteOp::RetractRelationship {
                    from_id,
                    to_id,
                    relation_type: relation_type.to_string(),
                    at,
                }],
                at,
            )
            .await
    }

    // --- Retrieval (§6 `search.*`) ---

    /// Hybrid vector + lexical search with RRF fusion (§4.5).
    pub async fn search(&self, options: &SearchOptions, now: DateTime<Utc>) -> Result<Vec<SearchResult>> {
        hybrid::search(options, now, self.storage.as_ref(), &self.embeddings, &self.reranker, &self.cache).await
    }

    /// Graph-RAG: vector-seeded relationship expansion (§4.6).
    pub async fn graph_rag(&self, options: &SearchOptions, now: DateTime<Utc>) -> Result<Vec<SearchResult>> {
        graph_rag::graph_rag(options, now, self.storage.as_ref(), &self.embeddings, &self.reranker).await
    }

    /// Multi-hop pivot reasoning: Retrieve-Reason-Prune-Aggregate (§4.7).
    pub async fn multi_hop(&self, query: &str, options: &MultiHopOptions, now: DateTime<Utc>) -> Result<MultiHopResult> {
        multihop::multi_hop(query, options, now, self.storage.as_ref(), &self.embeddings).await
    }

    /// Pick a retrieval strategy for `query` via the ε-greedy adaptive
    /// selector (§4.8), then dispatch to the matching pipeline. `VectorOnly`
    /// and `HybridFusion` both run the hybrid pipeline (the only difference
    /// between them is which candidate source historically performed
    /// better, not a distinct code path); `GraphWalk` and `CommunityExpansion`
    /// run graph-RAG; `SemanticWalk` runs the multi-hop pivot engine and
    /// folds its aggregated entities into ranked [`SearchResult`]s.
    pub async fn adaptive_search(
        &self,
        options: &SearchOptions,
        now: DateTime<Utc>,
    ) -> Result<(StrategyName, Vec<SearchResult>)> {
        let strategy = adaptive::select_strategy(self.storage.as_ref(), &options.query, &self.adaptive_options, now).await?;
        let results = match strategy {
            StrategyName::VectorOnly | StrategyName::HybridFusion => self.search(options, now).await?,
            StrategyName::GraphWalk | StrategyName::CommunityExpansion => self.graph_rag(options, now).await?,
            StrategyName::SemanticWalk => {
                let multi_hop_options = MultiHopOptions::default();
                let result = self.multi_hop(&options.query, &multi_hop_options, now).await?;
                self.aggregated_to_search_results(&result, options.limit).await?
            }
        };
        Ok((strategy, results))
    }

    /// Record the outcome of a retrieval call against the strategy that
    /// served it, folding in PRA/CAF-shaped rewards (§4.8).
    pub async fn record_strategy_outcome(
        &self,
        strategy: StrategyName,
        f1: f32,
        cost: f32,
        latency_ms: f32,
        retrieval_count: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let pra = adaptive::pra_reward(retrieval_count, &self.adaptive_options);
        let caf = adaptive::caf_reward(f1, retrieval_count, &self.adaptive_options);
        let shaped_f1 = if self.adaptive_options.enable_pra || self.adaptive_options.enable_caf {
            let mut shaped = f1;
            if self.adaptive_options.enable_pra {
                shaped *= pra;
            }
            if self.adaptive_options.enable_caf {
                shaped = shaped.max(caf);
            }
            shaped
        } else {
            f1
        };
        adaptive::record_outcome(self.storage.as_ref(), strategy, shaped_f1 >= 0.5, shaped_f1, cost, latency_ms, now).await
    }

    // --- Graph enrichment (§4.9) ---

    /// Derive candidate logical edges for an entity.
    pub async fn derive_logical_edges(&self, entity_id: Uuid, now: DateTime<Utc>) -> Result<Vec<LogicalEdge>> {
        logical_edges::derive(entity_id, self.storage.as_ref(), now).await
    }

    /// Materialise candidate logical edges into real relationships
    /// (idempotent).
    pub async fn materialize_logical_edges(&self, edges: Vec<LogicalEdge>, now: DateTime<Utc>) -> Result<usize> {
        logical_edges::materialize(self.storage.as_ref(), edges, now).await
    }

    // --- Temporal embeddings (§4.10) ---

    /// Synthesise a time-aware embedding for an entity as of `at`.
    pub async fn temporal_embedding(&self, entity_id: Uuid, at: DateTime<Utc>) -> Result<Option<TemporalEmbedding>> {
        temporal::synthesize(entity_id, at, self.storage.as_ref(), &self.embeddings).await
    }

    // --- Admin (§4.4) ---

    /// Drop every cached search result.
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear(self.storage.as_ref()).await
    }

    async fn aggregated_to_search_results(&self, result: &MultiHopResult, limit: usize) -> Result<Vec<SearchResult>> {
        use crate::types::{Explanation, MatchedItem};
        let mut out = Vec::with_capacity(result.aggregated.len().min(limit));
        for agg in result.aggregated.iter().take(limit) {
            let Some(entity) = self.storage.get_entity(agg.entity_id).await? else {
                continue;
            };
            let mut explanation = Explanation::default();
            explanation.add(format!(
                "multi-hop aggregate: {} occurrence(s), mean score {:.3}, min depth {}",
                agg.occurrences, agg.mean_score, agg.min_depth
            ));
            out.push(SearchResult::new(MatchedItem::Entity(entity), agg.mean_score, explanation));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::reranker::MockRerankerProvider;
    use crate::storage::InMemoryStorage;

    fn engine() -> AssociativeMemory {
        AssociativeMemory::new(
            Arc::new(InMemoryStorage::new()),
            EmbeddingService::new(Box::new(MockEmbeddingProvider::new(16))),
            RerankerService::new(Box::new(MockRerankerProvider::new())),
            MemoryConfig::default(),
        )
    }

    #[tokio::test]
    async fn remember_then_search_finds_the_entity() {
        let engine = engine();
        let now = Utc::now();
        let id = engine.remember_entity("Alice", "Person", now).await.unwrap();
        let options = SearchOptions::new("Alice");
        let results = engine.search(&options, now).await.unwrap();
        assert!(results.iter().any(|r| r.entity_id() == id));
    }

    #[tokio::test]
    async fn observe_on_unknown_entity_fails() {
        let engine = engine();
        let now = Utc::now();
        let err = engine.observe(Uuid::new_v4(), "hello", now).await.unwrap_err();
        assert_eq!(err.kind(), "not-found");
    }

    #[tokio::test]
    async fn relate_then_graph_rag_reaches_the_neighbour() {
        let engine = engine();
        let now = Utc::now();
        let alice = engine.remember_entity("Alice", "Person", now).await.unwrap();
        let project = engine.remember_entity("ProjectX", "Project", now).await.unwrap();
        engine.relate(alice, project, "works_on", 0.9, now).await.unwrap();

        let mut options = SearchOptions::new("Alice");
        options.graph_constraints.max_depth = 1;
        let results = engine.graph_rag(&options, now).await.unwrap();
        assert!(results.iter().any(|r| r.entity_id() == project));
    }

    #[tokio::test]
    async fn adaptive_search_returns_a_strategy_and_results() {
        let mut adaptive_options = AdaptiveOptions::default();
        adaptive_options.exploration_rate = 0.0;
        let engine = engine().with_adaptive_options(adaptive_options);
        let now = Utc::now();
        engine.remember_entity("Alice", "Person", now).await.unwrap();
        let options = SearchOptions::new("Alice");
        let (_strategy, results) = engine.adaptive_search(&options, now).await.unwrap();
        assert!(!results.is_empty());
    }

    #[tokio::test]
    async fn record_strategy_outcome_persists_a_row() {
        let engine = engine();
        let now = Utc::now();
        engine
            .record_strategy_outcome(StrategyName::HybridFusion, 0.8, 0.1, 5.0, 1, now)
            .await
            .unwrap();
    }
}
