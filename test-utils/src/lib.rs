//! # Test Utilities
//!
//! Shared fixture builders and harnesses for testing `memory-core`: entity,
//! observation, and relationship constructors with sane defaults, a
//! fully-wired in-memory [`MemoryHarness`], and a couple of small named
//! fixtures (`Alice/Bob/ProjectX`, an AI-research knowledge graph) that
//! mirror the end-to-end scenarios used to validate the retrieval core.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use memory_core::config::MemoryConfig;
use memory_core::embeddings::{EmbeddingService, MockEmbeddingProvider};
use memory_core::engine::AssociativeMemory;
use memory_core::error::Result;
use memory_core::reranker::{MockRerankerProvider, RerankerService};
use memory_core::storage::{InMemoryStorage, StorageBackend};
use uuid::Uuid;

/// A fully-wired [`AssociativeMemory`] over [`InMemoryStorage`] with
/// deterministic mock embedding/reranker providers, suitable for exercising
/// every retrieval pipeline without a real model runtime.
pub struct MemoryHarness {
    /// The wired engine under test.
    pub memory: AssociativeMemory,
    /// Direct handle to the backing store, for assertions that bypass the
    /// engine (e.g. checking a retracted row is still present at an
    /// earlier timepoint).
    pub storage: Arc<InMemoryStorage>,
}

impl MemoryHarness {
    /// Build a harness with the default embedding dimension (1024).
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimension(1024)
    }

    /// Build a harness whose mock embedding provider produces vectors of
    /// `dimension` length, useful for smaller, faster property tests.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        let embeddings = EmbeddingService::new(Box::new(MockEmbeddingProvider::new(dimension)));
        let reranker = RerankerService::new(Box::new(MockRerankerProvider::new()));
        let mut config = MemoryConfig::default();
        config.embedding_dimension = dimension;
        let engine_storage: Arc<dyn StorageBackend> = storage.clone();
        let memory = AssociativeMemory::new(engine_storage, embeddings, reranker, config);
        Self { memory, storage }
    }

    /// Create and remember an entity, returning its id.
    pub async fn entity(&self, name: &str, kind: &str, now: DateTime<Utc>) -> Result<Uuid> {
        self.memory.remember_entity(name, kind, now).await
    }

    /// Attach an observation to an existing entity.
    pub async fn observation(&self, entity_id: Uuid, text: &str, now: DateTime<Utc>) -> Result<Uuid> {
        self.memory.observe(entity_id, text, now).await
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
        self.memory.relate(from_id, to_id, relation_type, strength, now).await
    }
}

impl Default for MemoryHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Entity ids produced by [`seed_people_fixture`], matching §8 scenario 1-3
/// of the retrieval core's testable-properties section: `Alice`/`Bob`, both
/// `works_on` a shared `ProjectX`, with one observation on `Alice`.
pub struct PeopleFixture {
    pub alice: Uuid,
    pub bob: Uuid,
    pub project_x: Uuid,
    pub alice_typescript_observation: Uuid,
}

/// Seed the `Alice`/`Bob`/`ProjectX` fixture used by the hybrid-search and
/// context-boost scenario tests.
pub async fn seed_people_fixture(harness: &MemoryHarness, now: DateTime<Utc>) -> Result<PeopleFixture> {
    let alice = harness.entity("Alice", "Person", now).await?;
    let bob = harness.entity("Bob", "Person", now).await?;
    let project_x = harness.entity("ProjectX", "Project", now).await?;
    harness.relate(alice, project_x, "works_on", 0.9, now).await?;
    harness.relate(bob, project_x, "works_on", 0.9, now).await?;
    let alice_typescript_observation = harness
        .observation(alice, "Alice prefers TypeScript", now)
        .await?;
    Ok(PeopleFixture {
        alice,
        bob,
        project_x,
        alice_typescript_observation,
    })
}

/// Entity ids produced by [`seed_ai_research_fixture`]: a small knowledge
/// graph of NLP/transformer-architecture entities, used by the multi-hop
/// pivot engine's "transformers for NLP" scenario (§8 scenario 5).
pub struct AiResearchFixture {
    pub bert: Uuid,
    pub gpt: Uuid,
    pub transformer: Uuid,
    pub attention_mechanism: Uuid,
    pub nlp: Uuid,
}

/// Seed a small AI-research knowledge graph:
/// `BERT` / `GPT` --uses--> `Transformer Architecture` --built_on-->
/// `Attention Mechanism`, and `Transformer Architecture` --enables-->
/// `NLP`, with one observation per entity describing its role so both
/// the lexical and vector paths have signal to retrieve against.
pub async fn seed_ai_research_fixture(harness: &MemoryHarness, now: DateTime<Utc>) -> Result<AiResearchFixture> {
    let bert = harness.entity("BERT", "Model", now).await?;
    let gpt = harness.entity("GPT", "Model", now).await?;
    let transformer = harness.entity("Transformer Architecture", "Architecture", now).await?;
    let attention_mechanism = harness.entity("Attention Mechanism", "Concept", now).await?;
    let nlp = harness.entity("NLP", "Field", now).await?;

    harness.relate(bert, transformer, "uses", 0.9, now).await?;
    harness.relate(gpt, transformer, "uses", 0.9, now).await?;
    harness
        .relate(transformer, attention_mechanism, "built_on", 0.95, now)
        .await?;
    harness.relate(transformer, nlp, "enables", 0.85, now).await?;
    harness.relate(bert, nlp, "applied_to", 0.8, now).await?;

    harness
        .observation(bert, "BERT is a transformer model pretrained for NLP tasks", now)
        .await?;
    harness
        .observation(gpt, "GPT is a transformer model for generative NLP tasks", now)
        .await?;
    harness
        .observation(
            transformer,
            "The transformer architecture is built on the attention mechanism",
            now,
        )
        .await?;
    harness
        .observation(
            attention_mechanism,
            "Attention mechanisms weight relevant tokens in a sequence",
            now,
        )
        .await?;
    harness
        .observation(nlp, "NLP covers tasks like translation, summarization, and QA", now)
        .await?;

    Ok(AiResearchFixture {
        bert,
        gpt,
        transformer,
        attention_mechanism,
        nlp,
    })
}
