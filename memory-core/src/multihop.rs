//! Multi-hop vector pivot engine (§4.7): Retrieve–Reason–Prune.
//!
//! Retrieve: top `branching_factor` HNSW pivots. Reason: confidence-decayed
//! depth-first traversal from each pivot, bounded by `max_nodes_explored`
//! globally and a per-path visited set guarding against cycles. Prune: a
//! helpfulness score drops low-quality paths. Aggregate: fold every path's
//! nodes into a per-entity occurrence/score/depth summary.
//!
//! The cycle guard is scoped per path rather than to the whole traversal,
//! since paths here are transient search artefacts rather than stored
//! edges that must never cycle globally.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::constants::{defaults, logging};
use crate::embeddings::EmbeddingService;
use crate::error::Result;
use crate::math::cosine_similarity;
use crate::storage::StorageBackend;
use crate::types::MultiHopOptions;

/// A single node visited along a path, including the pivot itself at `depth
/// = 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathNode {
    pub entity_id: Uuid,
    pub depth: usize,
    /// Decayed confidence at this node.
    pub confidence: f32,
}

/// A root-to-leaf traversal from one pivot, surviving helpfulness pruning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    pub pivot_id: Uuid,
    pub nodes: Vec<PathNode>,
    /// Confidence of the path's final node.
    pub confidence: f32,
    /// `0.6·confidence + 0.4·length_penalty·confidence`.
    pub helpfulness: f32,
}

/// A per-entity summary folded across every surviving path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedEntity {
    pub entity_id: Uuid,
    pub occurrences: usize,
    pub max_score: f32,
    pub mean_score: f32,
    pub min_depth: usize,
}

/// The full Retrieve–Reason–Prune–Aggregate result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiHopResult {
    pub pivots: Vec<Uuid>,
    pub paths: Vec<Path>,
    pub aggregated: Vec<AggregatedEntity>,
}

/// Run the §4.7 multi-hop pivot engine for `query`.
#[instrument(skip(query, options, storage, embeddings), fields(prefix = logging::PREFIX_MULTI_HOP, query = %query))]
pub async fn multi_hop(
    query: &str,
    options: &MultiHopOptions,
    now: DateTime<Utc>,
    storage: &dyn StorageBackend,
    embeddings: &EmbeddingService,
) -> Result<MultiHopResult> {
    let embed_outcome = embeddings.embed(query).await;
    // Per-pivot bound is always capped at `max_pivot_depth`, regardless of a
    // larger requested `max_hops`.
    let max_depth = options.max_hops.min(options.max_pivot_depth);

    let pivot_hits = storage
        .vector_search(&embed_outcome.vector, false, options.branching_factor)
        .await?;
    let pivots: Vec<Uuid> = pivot_hits.iter().map(|h| h.entity_id).collect();

    let mut nodes_explored = 0usize;
    let mut paths = Vec::new();
    for hit in &pivot_hits {
        if nodes_explored >= options.max_nodes_explored {
            break;
        }
        let mut visited = HashSet::new();
        visited.insert(hit.entity_id);
        let mut path_nodes = vec![PathNode {
            entity_id: hit.entity_id,
            depth: 0,
            confidence: hit.raw_score,
        }];
        explore(
            storage,
            &embed_outcome.vector,
            hit.entity_id,
            hit.entity_id,
            0,
            hit.raw_score,
            max_depth,
            options.confidence_threshold,
            &mut nodes_explored,
            options.max_nodes_explored,
            &mut visited,
            &mut path_nodes,
            &mut paths,
            now,
        )
        .await?;
    }

    let aggregated = aggregate(&paths);
    Ok(MultiHopResult { pivots, paths, aggregated })
}

/// Depth-first expansion from `current`, emitting one [`Path`] per leaf
/// reached (depth bound, node-budget exhaustion, or no surviving
/// neighbour). Recursion is boxed since `async fn` cannot be directly
/// self-referential.
#[allow(clippy::too_many_arguments)]
fn explore<'a>(
    storage: &'a dyn StorageBackend,
    query_embedding: &'a [f32],
    pivot_id: Uuid,
    current: Uuid,
    depth: usize,
    confidence: f32,
    max_depth: usize,
    confidence_threshold: f32,
    nodes_explored: &'a mut usize,
    max_nodes_explored: usize,
    visited: &'a mut HashSet<Uuid>,
    path_nodes: &'a mut Vec<PathNode>,
    paths: &'a mut Vec<Path>,
    now: DateTime<Utc>,
) -> BoxFuture<'a, Result<()>> {
    async move {
        if depth >= max_depth || *nodes_explored >= max_nodes_explored {
            emit_path(pivot_id, path_nodes, paths, confidence_threshold);
            return Ok(());
        }

        let relationships = storage.relationships_for_entity(current).await?;
        let mut expanded_any = false;
        for rel in relationships {
            if !rel.validity.is_visible_at(now) {
                continue;
            }
            let neighbour_id = if rel.from_id == current { rel.to_id } else { rel.from_id };
            if visited.contains(&neighbour_id) {
                continue;
            }
            if *nodes_explored >= max_nodes_explored {
                break;
            }
            let Some(neighbour) = storage.get_entity(neighbour_id).await? else {
                continue;
            };
            if !neighbour.is_asserted_at(now) {
                continue;
            }

            let cosine = neighbour
                .content_embedding
                .as_ref()
                .map_or(0.0, |embedding| cosine_similarity(query_embedding, embedding));
            let rank = storage
                .entity_rank(neighbour_id)
                .await?
                .unwrap_or(defaults::MULTI_HOP_FALLBACK_RANK)
                .min(1.0);
            let neighbour_score = defaults::MULTI_HOP_NEIGHBOUR_WEIGHT_SIMILARITY * cosine
                + defaults::MULTI_HOP_NEIGHBOUR_WEIGHT_STRENGTH * rel.strength
                + defaults::MULTI_HOP_NEIGHBOUR_WEIGHT_RANK * rank;
            let decayed = confidence * defaults::MULTI_HOP_CONFIDENCE_DECAY_PER_HOP * neighbour_score;
            if decayed < confidence_threshold {
                continue;
            }

            expanded_any = true;
            *nodes_explored += 1;
            visited.insert(neighbour_id);
            path_nodes.push(PathNode {
                entity_id: neighbour_id,
                depth: depth + 1,
                confidence: decayed,
            });
            explore(
                storage,
                query_embedding,
                pivot_id,
                neighbour_id,
                depth + 1,
                decayed,
                max_depth,
                confidence_threshold,
                nodes_explored,
                max_nodes_explored,
                visited,
                path_nodes,
                paths,
                now,
            )
            .await?;
            path_nodes.pop();
            visited.remove(&neighbour_id);
        }

        if !expanded_any {
            emit_path(pivot_id, path_nodes, paths, confidence_threshold);
        }
        Ok(())
    }
    .boxed()
}

/// Score and, if it survives, record the path currently held in
/// `path_nodes`. The helpfulness threshold reuses `confidence_threshold`
/// rather than a separate tunable.
fn emit_path(pivot_id: Uuid, path_nodes: &[PathNode], paths: &mut Vec<Path>, confidence_threshold: f32) {
    let Some(last) = path_nodes.last() else {
        return;
    };
    let confidence = last.confidence;
    let hops = path_nodes.len().saturating_sub(1);
    let length_penalty = 1.0 / (1.0 + defaults::MULTI_HOP_LENGTH_PENALTY_K * hops as f32);
    let helpfulness = defaults::MULTI_HOP_HELPFULNESS_CONFIDENCE_WEIGHT * confidence
        + defaults::MULTI_HOP_HELPFULNESS_LENGTH_WEIGHT * length_penalty * confidence;
    if helpfulness < confidence_threshold {
        return;
    }
    paths.push(Path {
        pivot_id,
        nodes: path_nodes.to_vec(),
        confidence,
        helpfulness,
    });
}

/// Fold every surviving path's nodes into a per-entity summary, sorted by
/// `(occurrences desc, mean_score desc, min_depth asc)`.
fn aggregate(paths: &[Path]) -> Vec<AggregatedEntity> {
    struct Acc {
        occurrences: usize,
        max_score: f32,
        sum_score: f32,
        min_depth: usize,
    }

    let mut map: HashMap<Uuid, Acc> = HashMap::new();
    for path in paths {
        for node in &path.nodes {
            let acc = map.entry(node.entity_id).or_insert(Acc {
                occurrences: 0,
                max_score: 0.0,
                sum_score: 0.0,
                min_depth: usize::MAX,
            });
            acc.occurrences += 1;
            acc.max_score = acc.max_score.max(node.confidence);
            acc.sum_score += node.confidence;
            acc.min_depth = acc.min_depth.min(node.depth);
        }
    }

    let mut aggregated: Vec<AggregatedEntity> = map
        .into_iter()
        .map(|(entity_id, acc)| AggregatedEntity {
            entity_id,
            occurrences: acc.occurrences,
            max_score: acc.max_score,
            mean_score: acc.sum_score / acc.occurrences as f32,
            min_depth: acc.min_depth,
        })
        .collect();
    aggregated.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then(b.mean_score.total_cmp(&a.mean_score))
            .then(a.min_depth.cmp(&b.min_depth))
    });
    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::storage::{InMemoryStorage, WriteOp};
    use crate::types::{Entity, Relationship};

    async fn fixture() -> (InMemoryStorage, DateTime<Utc>, Uuid, Uuid, Uuid) {
        let storage = InMemoryStorage::new();
        let now = Utc::now();
        let mut transformers = Entity::new("Transformers", "Concept", now);
        transformers.content_embedding = Some(vec![1.0, 0.0, 0.0]);
        let mut bert = Entity::new("BERT", "Model", now);
        bert.content_embedding = Some(vec![0.9, 0.1, 0.0]);
        let mut nlp = Entity::new("NLP", "Field", now);
        nlp.content_embedding = Some(vec![0.8, 0.2, 0.0]);

        let transformers_id = transformers.id;
        let bert_id = bert.id;
        let nlp_id = nlp.id;

        let r1 = Relationship::new(transformers_id, bert_id, "used_in", 0.9, now).unwrap();
        let r2 = Relationship::new(bert_id, nlp_id, "applies_to", 0.8, now).unwrap();

        storage
            .transaction(
                vec![
                    WriteOp::PutEntity(transformers),
                    WriteOp::PutEntity(bert),
                    WriteOp::PutEntity(nlp),
                    WriteOp::PutRelationship(r1),
                    WriteOp::PutRelationship(r2),
                ],
                now,
            )
            .await
            .unwrap();
        storage.set_entity_rank(bert_id, 0.8);
        storage.set_entity_rank(nlp_id, 0.6);

        (storage, now, transformers_id, bert_id, nlp_id)
    }

    #[tokio::test]
    async fn aggregated_result_contains_both_hops() {
        let (storage, now, _transformers_id, bert_id, nlp_id) = fixture().await;
        let embeddings = EmbeddingService::new(Box::new(MockEmbeddingProvider::new(16)));
        let mut options = MultiHopOptions::default();
        options.max_hops = 5;
        options.confidence_threshold = 0.0;

        let result = multi_hop("transformers for NLP", &options, now, &storage, &embeddings)
            .await
            .unwrap();

        let ids: Vec<Uuid> = result.aggregated.iter().map(|a| a.entity_id).collect();
        assert!(ids.contains(&bert_id));
        assert!(ids.contains(&nlp_id));
        let max_depth_seen = result.paths.iter().flat_map(|p| p.nodes.iter().map(|n| n.depth)).max().unwrap_or(0);
        assert!(max_depth_seen <= defaults::MULTI_HOP_MAX_PIVOT_DEPTH);
    }

    #[tokio::test]
    async fn high_confidence_threshold_prunes_deep_hops() {
        let (storage, now, _transformers_id, _bert_id, _nlp_id) = fixture().await;
        let embeddings = EmbeddingService::new(Box::new(MockEmbeddingProvider::new(16)));
        let mut options = MultiHopOptions::default();
        options.confidence_threshold = 0.999;

        let result = multi_hop("transformers", &options, now, &storage, &embeddings)
            .await
            .unwrap();
        assert!(result.paths.iter().all(|p| p.nodes.len() == 1));
    }

    #[test]
    fn aggregate_sorts_by_occurrences_then_mean_then_depth() {
        let pivot = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let paths = vec![
            Path {
                pivot_id: pivot,
                nodes: vec![
                    PathNode { entity_id: pivot, depth: 0, confidence: 1.0 },
                    PathNode { entity_id: a, depth: 1, confidence: 0.9 },
                ],
                confidence: 0.9,
                helpfulness: 0.8,
            },
            Path {
                pivot_id: pivot,
                nodes: vec![
                    PathNode { entity_id: pivot, depth: 0, confidence: 1.0 },
                    PathNode { entity_id: a, depth: 1, confidence: 0.7 },
                    PathNode { entity_id: b, depth: 2, confidence: 0.6 },
                ],
                confidence: 0.6,
                helpfulness: 0.5,
            },
        ];
        let aggregated = aggregate(&paths);
        assert_eq!(aggregated[0].entity_id, pivot);
        assert_eq!(aggregated[0].occurrences, 2);
    }
}
