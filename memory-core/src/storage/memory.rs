//! Reference [`StorageBackend`] implementation: brute-force in-memory,
//! sufficient for correctness testing of everything layered on top of the
//! storage binding without a live Datalog engine.
//!
//! State lives behind `Arc<RwLock<HashMap<...>>>` maps rather than any
//! indexed structure, so every lookup is a linear scan; that's acceptable
//! here since this backend exists to validate behaviour against the trait,
//! not to perform at scale.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result, StorageError};
use crate::math::cosine_similarity;
use crate::types::{Entity, Observation, Relationship, StrategyName, StrategyPerformance};

use super::{CacheRow, IndexHit, StorageBackend, WriteOp};

#[derive(Default)]
struct State {
    entities: HashMap<Uuid, Entity>,
    observations: HashMap<Uuid, Observation>,
    relationships: Vec<Relationship>,
    entity_rank: HashMap<Uuid, f32>,
    cache: HashMap<String, CacheRow>,
    strategy_performance: HashMap<&'static str, StrategyPerformance>,
}

/// Brute-force in-memory storage backend.
#[derive(Default)]
pub struct InMemoryStorage {
    state: RwLock<State>,
}

impl InMemoryStorage {
    /// Construct an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a PageRank value for an entity (used by tests and by the
    /// periodic batch job a real deployment would run).
    pub fn set_entity_rank(&self, entity_id: Uuid, rank: f32) {
        self.state.write().entity_rank.insert(entity_id, rank);
    }

    fn validate_write(state: &State, op: &WriteOp) -> Result<()> {
        match op {
            WriteOp::PutObservation(o) => {
                if !state.entities.contains_key(&o.entity_id) {
                    return Err(Error::Validation(format!(
                        "observation references unknown entity {}",
                        o.entity_id
                    )));
                }
            }
            WriteOp::PutRelationship(r) => {
                if r.from_id == r.to_id {
                    return Err(Error::self_loop(r.from_id));
                }
                if !(0.0..=1.0).contains(&r.strength) {
                    return Err(Error::strength_out_of_range(r.strength));
                }
                if !state.entities.contains_key(&r.from_id) || !state.entities.contains_key(&r.to_id)
                {
                    return Err(Error::Validation(
                        "relationship endpoints must be known entities".to_string(),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn apply_write(state: &mut State, op: WriteOp, now: DateTime<Utc>) {
        match op {
            WriteOp::PutEntity(e) => {
                state.entities.insert(e.id, e);
            }
            WriteOp::RetractEntity { id, at } => {
                if let Some(e) = state.entities.get_mut(&id) {
                    e.validity = e.validity.retract_at(at);
                }
                for o in state.observations.values_mut() {
                    if o.entity_id == id {
                        o.validity = o.validity.retract_at(at);
                    }
                }
                for r in &mut state.relationships {
                    if r.from_id == id || r.to_id == id {
                        r.validity = r.validity.retract_at(at);
                    }
                }
            }
            WriteOp::PutObservation(o) => {
                state.observations.insert(o.id, o);
            }
            WriteOp::RetractObservation { id, at } => {
                if let Some(o) = state.observations.get_mut(&id) {
                    o.validity = o.validity.retract_at(at);
                }
            }
            WriteOp::PutRelationship(r) => {
                state.relationships.push(r);
            }
            WriteOp::RetractRelationship {
                from_id,
                to_id,
                relation_type,
                at,
            } => {
                for r in &mut state.relationships {
                    if r.from_id == from_id && r.to_id == to_id && r.relation_type == relation_type {
                        r.validity = r.validity.retract_at(at);
                    }
                }
            }
        }
        let _ = now;
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn transaction(&self, ops: Vec<WriteOp>, now: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write();
        for op in &ops {
            Self::validate_write(&state, op)?;
        }
        for op in ops {
            Self::apply_write(&mut state, op, now);
        }
        Ok(())
    }

    async fn get_entity(&self, id: Uuid) -> Result<Option<Entity>> {
        Ok(self.state.read().entities.get(&id).cloned())
    }

    async fn all_entities(&self) -> Result<Vec<Entity>> {
        Ok(self.state.read().entities.values().cloned().collect())
    }

    async fn observations_for_entity(&self, entity_id: Uuid) -> Result<Vec<Observation>> {
        Ok(self
            .state
            .read()
            .observations
            .values()
            .filter(|o| o.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn all_observations(&self) -> Result<Vec<Observation>> {
        Ok(self.state.read().observations.values().cloned().collect())
    }

    async fn relationships_for_entity(&self, entity_id: Uuid) -> Result<Vec<Relationship>> {
        Ok(self
            .state
            .read()
            .relationships
            .iter()
            .filter(|r| r.from_id == entity_id || r.to_id == entity_id)
            .cloned()
            .collect())
    }

    async fn all_relationships(&self) -> Result<Vec<Relationship>> {
        Ok(self.state.read().relationships.clone())
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        use_name_index: bool,
        k: usize,
    ) -> Result<Vec<IndexHit>> {
        let state = self.state.read();
        let mut hits: Vec<IndexHit> = state
            .entities
            .values()
            .filter_map(|e| {
                let embedding = if use_name_index {
                    e.name_embedding.as_ref()
                } else {
                    e.content_embedding.as_ref()
                }?;
                let score = cosine_similarity(query_embedding, embedding);
                Some(IndexHit {
                    entity_id: e.id,
                    raw_score: score,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.raw_score.total_cmp(&a.raw_score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn fulltext_search(&self, query: &str, k: usize) -> Result<Vec<IndexHit>> {
        let needle: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let state = self.state.read();
        let mut scores: HashMap<Uuid, f32> = HashMap::new();

        for e in state.entities.values() {
            let score = token_overlap_score(&needle, &e.name.to_lowercase());
            if score > 0.0 {
                let slot = scores.entry(e.id).or_insert(0.0);
                *slot = slot.max(score);
            }
        }
        for o in state.observations.values() {
            let score = token_overlap_score(&needle, &o.text.to_lowercase());
            if score > 0.0 {
                let slot = scores.entry(o.entity_id).or_insert(0.0);
                *slot = slot.max(score);
            }
        }

        let mut hits: Vec<IndexHit> = scores
            .into_iter()
            .map(|(entity_id, raw_score)| IndexHit {
                entity_id,
                raw_score,
            })
            .collect();
        hits.sort_by(|a, b| b.raw_score.total_cmp(&a.raw_score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn entity_rank(&self, entity_id: Uuid) -> Result<Option<f32>> {
        Ok(self.state.read().entity_rank.get(&entity_id).copied())
    }

    async fn get_cache_row(&self, fingerprint: &str) -> Result<Option<CacheRow>> {
        Ok(self.state.read().cache.get(fingerprint).cloned())
    }

    async fn all_cache_rows(&self) -> Result<Vec<CacheRow>> {
        Ok(self.state.read().cache.values().cloned().collect())
    }

    async fn put_cache_row(&self, row: CacheRow) -> Result<()> {
        self.state.write().cache.insert(row.fingerprint.clone(), row);
        Ok(())
    }

    async fn clear_cache(&self) -> Result<()> {
        self.state.write().cache.clear();
        Ok(())
    }

    async fn get_strategy_performance(
        &self,
        strategy: StrategyName,
    ) -> Result<Option<StrategyPerformance>> {
        Ok(self
            .state
            .read()
            .strategy_performance
            .get(strategy.as_str())
            .cloned())
    }

    async fn put_strategy_performance(&self, row: StrategyPerformance) -> Result<()> {
        self.state
            .write()
            .strategy_performance
            .insert(row.strategy.as_str(), row);
        Ok(())
    }
}

/// A query token counts as a near-match against a haystack word if their
/// Jaro-Winkler similarity is at least this high (catches typos and minor
/// inflections like plurals without conflating unrelated short words).
const NEAR_MATCH_SIMILARITY: f64 = 0.92;

/// Naive BM25-surrogate: fraction of query tokens present in `haystack`,
/// good enough to exercise the lexical fusion path without a real
/// full-text index. A real backend replaces this with BM25 proper.
///
/// An exact substring match scores a full point; otherwise the token is
/// compared against every haystack word with `strsim::jaro_winkler` and
/// scores its best similarity if that clears [`NEAR_MATCH_SIMILARITY`], so
/// a near-duplicate term (a typo, a plural) still contributes partial
/// credit instead of being dropped entirely.
fn token_overlap_score(needle: &[String], haystack: &str) -> f32 {
    if needle.is_empty() {
        return 0.0;
    }
    let haystack_words: Vec<&str> = haystack.split_whitespace().collect();
    let mut matched = 0.0_f32;
    for t in needle {
        if haystack.contains(t.as_str()) {
            matched += 1.0;
            continue;
        }
        let best_similarity = haystack_words
            .iter()
            .map(|w| strsim::jaro_winkler(t, w))
            .fold(0.0_f64, f64::max);
        if best_similarity >= NEAR_MATCH_SIMILARITY {
            matched += best_similarity as f32;
        }
    }
    matched / needle.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Relationship;

    fn backend() -> InMemoryStorage {
        InMemoryStorage::new()
    }

    #[tokio::test]
    async fn transaction_rejects_self_loop_and_commits_nothing() {
        let storage = backend();
        let now = Utc::now();
        let alice = Entity::new("Alice", "Person", now);
        let alice_id = alice.id;
        let bad_rel = Relationship {
            from_id: alice_id,
            to_id: alice_id,
            relation_type: "knows".to_string(),
            strength: 0.5,
            metadata: Default::default(),
            validity: crate::types::Validity::asserted_at(now),
        };
        let result = storage
            .transaction(
                vec![WriteOp::PutEntity(alice), WriteOp::PutRelationship(bad_rel)],
                now,
            )
            .await;
        assert!(result.is_err());
        assert!(storage.get_entity(alice_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transaction_rejects_observation_on_unknown_entity() {
        let storage = backend();
        let now = Utc::now();
        let orphan = Observation::new(Uuid::new_v4(), "hello", now);
        let result = storage
            .transaction(vec![WriteOp::PutObservation(orphan)], now)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn retracting_entity_cascades_to_observations_and_relationships() {
        let storage = backend();
        let now = Utc::now();
        let alice = Entity::new("Alice", "Person", now);
        let bob = Entity::new("Bob", "Person", now);
        let alice_id = alice.id;
        let bob_id = bob.id;
        let obs = Observation::new(alice_id, "Alice likes tea", now);
        let rel = Relationship::new(alice_id, bob_id, "knows", 0.5, now).unwrap();
        storage
            .transaction(
                vec![
                    WriteOp::PutEntity(alice),
                    WriteOp::PutEntity(bob),
                    WriteOp::PutObservation(obs.clone()),
                    WriteOp::PutRelationship(rel),
                ],
                now,
            )
            .await
            .unwrap();

        let later = now + chrono::Duration::hours(1);
        storage
            .transaction(
                vec![WriteOp::RetractEntity {
                    id: alice_id,
                    at: later,
                }],
                later,
            )
            .await
            .unwrap();

        let entity = storage.get_entity(alice_id).await.unwrap().unwrap();
        assert!(!entity.is_asserted_at(later));
        assert!(entity.is_asserted_at(now));

        let stored_obs = storage
            .observations_for_entity(alice_id)
            .await
            .unwrap()
            .into_iter()
            .find(|o| o.id == obs.id)
            .unwrap();
        assert!(!stored_obs.is_asserted_at(later));

        let rels = storage.relationships_for_entity(alice_id).await.unwrap();
        assert!(!rels[0].is_asserted_at(later));
    }

    #[tokio::test]
    async fn vector_search_ranks_by_cosine_similarity() {
        let storage = backend();
        let now = Utc::now();
        let mut a = Entity::new("A", "Thing", now);
        a.content_embedding = Some(vec![1.0, 0.0]);
        let mut b = Entity::new("B", "Thing", now);
        b.content_embedding = Some(vec![0.0, 1.0]);
        let a_id = a.id;
        storage
            .transaction(vec![WriteOp::PutEntity(a), WriteOp::PutEntity(b)], now)
            .await
            .unwrap();

        let hits = storage.vector_search(&[1.0, 0.0], false, 5).await.unwrap();
        assert_eq!(hits[0].entity_id, a_id);
        assert!(hits[0].raw_score > hits[1].raw_score);
    }

    #[tokio::test]
    async fn fulltext_search_matches_observation_text() {
        let storage = backend();
        let now = Utc::now();
        let alice = Entity::new("Alice", "Person", now);
        let alice_id = alice.id;
        let obs = Observation::new(alice_id, "Alice prefers TypeScript", now);
        storage
            .transaction(
                vec![WriteOp::PutEntity(alice), WriteOp::PutObservation(obs)],
                now,
            )
            .await
            .unwrap();

        let hits = storage.fulltext_search("typescript", 5).await.unwrap();
        assert_eq!(hits[0].entity_id, alice_id);
    }

    #[test]
    fn token_overlap_score_gives_partial_credit_for_a_near_duplicate_term() {
        let exact = token_overlap_score(&["typescript".to_string()], "alice prefers typescript");
        let near = token_overlap_score(&["typescrpit".to_string()], "alice prefers typescript");
        let unrelated = token_overlap_score(&["typescript".to_string()], "bob likes tea");
        assert_eq!(exact, 1.0);
        assert!(near > 0.0 && near < exact, "a near-duplicate term should score between 0 and an exact match, got {near}");
        assert_eq!(unrelated, 0.0);
    }
}
