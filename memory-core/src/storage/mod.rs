//! Storage binding (§4.1).
//!
//! The embedded Datalog engine underneath this binding is out of scope for
//! this crate: it is consumed through a narrow query interface rather than
//! a raw `run(program, params) -> {rows, headers}` surface. Instead of
//! modelling an ad hoc Datalog program builder for a database this crate
//! never implements, the binding exposes a fixed set of typed async trait
//! methods — the small, enumerable set of access patterns every component
//! above this layer actually needs (point lookups, vector search,
//! full-text search, edge traversal, cache/stat rows, transactional
//! writes).

mod memory;

pub use memory::InMemoryStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Entity, Observation, Relationship, SearchResult};

/// A single write destined for a [`StorageBackend::transaction`] call.
/// Transactions are atomic: validation (entity existence, self-loop,
/// strength range) is applied to every write before any is committed, and
/// any failure rolls the whole batch back.
#[derive(Debug, Clone)]
pub enum WriteOp {
    PutEntity(Entity),
    RetractEntity { id: Uuid, at: DateTime<Utc> },
    PutObservation(Observation),
    RetractObservation { id: Uuid, at: DateTime<Utc> },
    PutRelationship(Relationship),
    RetractRelationship {
        from_id: Uuid,
        to_id: Uuid,
        relation_type: String,
        at: DateTime<Utc>,
    },
}

/// A candidate returned from a vector or full-text index lookup, before
/// any post-join, filtering, decay, or boosting is applied.
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub entity_id: Uuid,
    /// `1 - cosine_distance` for vector hits, a normalised token-overlap
    /// score for full-text hits.
    pub raw_score: f32,
}

/// A single cached result list row (§3 "Search-cache row").
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct CacheRow {
    pub fingerprint: String,
    pub results: Vec<SearchResult>,
    pub query_embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// The narrow, typed query interface the retrieval algorithms are built
/// against. A real deployment implements this over an embedded Datalog
/// engine with HNSW and full-text indices; [`InMemoryStorage`] is the
/// reference implementation used by this crate's own tests.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Apply a batch of writes atomically, validating every write (entity
    /// existence, self-loop rejection, strength range) before committing
    /// any of them.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Validation`] if any write fails
    /// validation, or [`crate::error::Error::Storage`] if the backend
    /// itself fails; in either case nothing is committed.
    async fn transaction(&self, ops: Vec<WriteOp>, now: DateTime<Utc>) -> Result<()>;

    /// Fetch an entity by id, regardless of validity (callers filter by
    /// time themselves via [`crate::types::Entity::is_asserted_at`]).
    async fn get_entity(&self, id: Uuid) -> Result<Option<Entity>>;

    /// All entities, regardless of validity.
    async fn all_entities(&self) -> Result<Vec<Entity>>;

    /// All observations attached to `entity_id`, regardless of validity.
    async fn observations_for_entity(&self, entity_id: Uuid) -> Result<Vec<Observation>>;

    /// All observations, regardless of validity.
    async fn all_observations(&self) -> Result<Vec<Observation>>;

    /// All relationships incident to `entity_id` in either direction,
    /// regardless of validity.
    async fn relationships_for_entity(&self, entity_id: Uuid) -> Result<Vec<Relationship>>;

    /// All relationships, regardless of validity.
    async fn all_relationships(&self) -> Result<Vec<Relationship>>;

    /// Top-`k` nearest neighbours of `query_embedding` over `content_embedding`
    /// (or `name_embedding` if `use_name_index` is set), cosine distance.
    async fn vector_search(
        &self,
        query_embedding: &[f32],
        use_name_index: bool,
        k: usize,
    ) -> Result<Vec<IndexHit>>;

    /// Full-text search over entity `name` and observation `text`.
    async fn fulltext_search(&self, query: &str, k: usize) -> Result<Vec<IndexHit>>;

    /// PageRank for an entity, if the periodic batch job has populated one.
    async fn entity_rank(&self, entity_id: Uuid) -> Result<Option<f32>>;

    /// Fetch a cached result row by fingerprint, if present and unexpired
    /// (the caller applies the TTL check; this returns whatever is stored).
    async fn get_cache_row(&self, fingerprint: &str) -> Result<Option<CacheRow>>;

    /// Every stored cache row, used for the semantic near-hit scan.
    async fn all_cache_rows(&self) -> Result<Vec<CacheRow>>;

    /// Store/overwrite a cache row.
    async fn put_cache_row(&self, row: CacheRow) -> Result<()>;

    /// Drop every cache row (the admin `clear` operation, §4.4).
    async fn clear_cache(&self) -> Result<()>;

    /// Fetch persisted per-strategy performance.
    async fn get_strategy_performance(
        &self,
        strategy: crate::types::StrategyName,
    ) -> Result<Option<crate::types::StrategyPerformance>>;

    /// Store/overwrite persisted per-strategy performance.
    async fn put_strategy_performance(&self, row: crate::types::StrategyPerformance) -> Result<()>;
}
