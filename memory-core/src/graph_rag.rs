//! Graph-RAG (§4.6): vector-seeded BFS graph expansion with linear depth
//! attenuation, relation-type and target filters.
//!
//! Expansion is queue-driven with a depth counter and a visited set to
//! avoid revisiting nodes; the post-join filters and time-decay step are
//! shared with [`crate::search::hybrid`] rather than reimplemented here.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::constants::{defaults, logging};
use crate::embeddings::EmbeddingService;
use crate::error::Result;
use crate::reranker::RerankerService;
use crate::search::hybrid;
use crate::storage::StorageBackend;
use crate::types::{Explanation, MatchedItem, SearchOptions, SearchResult};

/// Run the §4.6 graph-RAG pipeline: vector-seed, BFS-expand, filter, decay,
/// optionally rerank.
#[instrument(skip(options, storage, embeddings, reranker), fields(prefix = logging::PREFIX_GRAPH_RAG, query = %options.query))]
pub async fn graph_rag(
    options: &SearchOptions,
    now: DateTime<Utc>,
    storage: &dyn StorageBackend,
    embeddings: &EmbeddingService,
    reranker: &RerankerService,
) -> Result<Vec<SearchResult>> {
    let embed_outcome = embeddings.embed(&options.query).await;
    let constraints = options.graph_constraints.clone().clamped();

    let seed_k = options.limit * defaults::GRAPH_RAG_SEED_MULTIPLIER;
    let seeds = storage.vector_search(&embed_outcome.vector, false, seed_k).await?;

    let mut best: HashMap<Uuid, f32> = HashMap::new();
    let mut queue: VecDeque<(Uuid, usize, f32)> = VecDeque::new();
    for seed in &seeds {
        let score = seed.raw_score * depth_attenuation(0);
        update_best(&mut best, seed.entity_id, score);
        queue.push_back((seed.entity_id, 0, seed.raw_score));
    }

    let mut expanded: HashSet<(Uuid, usize)> = HashSet::new();
    while let Some((entity_id, depth, seed_raw_score)) = queue.pop_front() {
        if depth >= constraints.max_depth || !expanded.insert((entity_id, depth)) {
            continue;
        }
        let relationships = storage.relationships_for_entity(entity_id).await?;
        for rel in relationships {
            if !rel.validity.is_visible_at(now) {
                continue;
            }
            if !constraints.required_relations.is_empty()
                && !constraints.required_relations.contains(&rel.relation_type)
            {
                continue;
            }
            let neighbour = if rel.from_id == entity_id { rel.to_id } else { rel.from_id };
            let next_depth = depth + 1;
            let score = seed_raw_score * depth_attenuation(next_depth);
            update_best(&mut best, neighbour, score);
            if next_depth < constraints.max_depth {
                queue.push_back((neighbour, next_depth, seed_raw_score));
            }
        }
    }

    let mut results = Vec::with_capacity(best.len());
    for (entity_id, raw_score) in best {
        let Some(entity) = storage.get_entity(entity_id).await? else {
            continue;
        };
        if !entity.is_asserted_at(now) {
            continue;
        }
        if !hybrid::passes_kind_filter(options, &entity) || !hybrid::passes_metadata_filter(options, &entity) {
            continue;
        }
        if !hybrid::passes_time_range(options, &entity, now) {
            continue;
        }
        if !constraints.target_ids.is_empty() && !constraints.target_ids.contains(&entity_id) {
            continue;
        }

        let decay = hybrid::time_decay_factor(entity.validity.asserted_at, now);
        let mut explanation = Explanation::default();
        explanation.used_zero_vector = embed_outcome.used_zero_vector;
        explanation.add(format!("graph-rag depth-attenuated score: {raw_score:.3}"));
        explanation.add(format!("time-decay x{decay:.3}"));
        results.push(SearchResult::new(MatchedItem::Entity(entity), raw_score * decay, explanation));
    }

    results.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut results = if options.rerank {
        hybrid::apply_rerank(reranker, &options.query, results).await
    } else {
        results
    };
    results.truncate(options.limit);
    Ok(results)
}

/// `(1 − 0.2·depth)`, clamped at zero: the linear attenuation would
/// otherwise go negative for `depth ≥ 5`, and a negative relevance score
/// has no sensible meaning downstream of the `[0, 1]` score-bounds
/// invariant.
fn depth_attenuation(depth: usize) -> f32 {
    (1.0 - defaults::GRAPH_RAG_DEPTH_ATTENUATION * depth as f32).max(0.0)
}

fn update_best(best: &mut HashMap<Uuid, f32>, entity_id: Uuid, score: f32) {
    let slot = best.entry(entity_id).or_insert(0.0);
    if score > *slot {
        *slot = score;
    }
}
