//! Hybrid search (§4.5): the central eight-step retrieval pipeline —
//! embed, cache lookup, vector + lexical retrieval with RRF fusion,
//! post-join filtering, time-decay, context-boost, optional rerank, cache
//! store.
//!
//! A vector score map and an FTS score map are combined via Reciprocal
//! Rank Fusion over ranked id lists rather than a weighted sum of raw
//! scores, since RRF stays well-behaved when the two score scales differ.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::cache::RetrievalCache;
use crate::constants::{defaults, logging};
use crate::embeddings::EmbeddingService;
use crate::error::Result;
use crate::reranker::RerankerService;
use crate::storage::StorageBackend;
use crate::types::{Entity, Explanation, MatchedItem, Observation, SearchOptions, SearchResult};

use super::fusion::{normalize, rrf_fuse};

/// Run the §4.5 hybrid search pipeline against `options`.
///
/// Falls back to a degraded vector-only path if any lexical/post-join
/// storage call fails; propagates the error only if the vector-only path
/// also fails, since at that point no ranking is possible at all.
#[instrument(skip(options, storage, embeddings, reranker, cache), fields(prefix = logging::PREFIX_SEARCH, query = %options.query))]
pub async fn search(
    options: &SearchOptions,
    now: DateTime<Utc>,
    storage: &dyn StorageBackend,
    embeddings: &EmbeddingService,
    reranker: &RerankerService,
    cache: &RetrievalCache,
) -> Result<Vec<SearchResult>> {
    let embed_outcome = embeddings.embed(&options.query).await;

    if let Some(cached) = cache.lookup(storage, options, &embed_outcome.vector).await {
        debug!(prefix = logging::PREFIX_SEARCH, "cache hit");
        return Ok(cached);
    }

    let results = match run_pipeline(options, now, storage, &embed_outcome.vector, embed_outcome.used_zero_vector).await {
        Ok(results) => results,
        Err(err) => {
            warn!(
                prefix = logging::PREFIX_SEARCH,
                error = %err,
                "hybrid pipeline failed, degrading to vector-only"
            );
            vector_only_pipeline(options, now, storage, &embed_outcome.vector, embed_outcome.used_zero_vector).await?
        }
    };

    let results = if options.rerank {
        apply_rerank(reranker, &options.query, results).await
    } else {
        results
    };

    let mut results = results;
    results.truncate(options.limit);

    cache.store(storage, options, embed_outcome.vector.clone(), results.clone()).await?;
    Ok(results)
}

/// Candidate pool size upstream of the final limit, large enough that
/// filtering/decay/rerank has something to work with.
fn candidate_k(limit: usize) -> usize {
    (limit * 4).max(20)
}

async fn run_pipeline(
    options: &SearchOptions,
    now: DateTime<Utc>,
    storage: &dyn StorageBackend,
    query_embedding: &[f32],
    used_zero_vector: bool,
) -> Result<Vec<SearchResult>> {
    let k = candidate_k(options.limit);
    let use_name_index = options.prefers_name_index();

    let vector_hits = storage.vector_search(query_embedding, use_name_index, k).await?;
    let lexical_hits = storage.fulltext_search(&options.query, k).await?;

    let vector_raw: HashMap<Uuid, f32> = vector_hits.iter().map(|h| (h.entity_id, h.raw_score)).collect();
    let lexical_raw: HashSet<Uuid> = lexical_hits.iter().map(|h| h.entity_id).collect();

    let vector_ids: Vec<Uuid> = vector_hits.into_iter().map(|h| h.entity_id).collect();
    let lexical_ids: Vec<Uuid> = lexical_hits.into_iter().map(|h| h.entity_id).collect();

    let fused = rrf_fuse(&[(vector_ids, 1.0), (lexical_ids, 1.0)], defaults::RRF_K);
    let normalised = normalize(&fused);

    let mut results = Vec::with_capacity(normalised.len());
    for (entity_id, base_score) in &normalised {
        let Some(entity) = storage.get_entity(*entity_id).await? else {
            continue;
        };
        if !entity.is_asserted_at(now) {
            continue;
        }
        if !passes_kind_filter(options, &entity) || !passes_metadata_filter(options, &entity) {
            continue;
        }
        if !passes_time_range(options, &entity, now) {
            continue;
        }
        if !options.graph_constraints.target_ids.is_empty()
            && !options.graph_constraints.target_ids.contains(entity_id)
        {
            continue;
        }
        if !options.graph_constraints.required_relations.is_empty()
            && !has_required_relation(storage, *entity_id, &options.graph_constraints.required_relations, now).await?
        {
            continue;
        }

        let observations = storage.observations_for_entity(*entity_id).await?;
        let (item, asserted_at) = best_match(options, entity, observations, now);

        let mut explanation = Explanation::default();
        explanation.used_zero_vector = used_zero_vector;
        if let Some(raw) = vector_raw.get(entity_id) {
            explanation.add(format!("vector: {raw:.3}"));
        }
        if lexical_raw.contains(entity_id) {
            explanation.add("lexical match");
        }

        let decay = time_decay_factor(asserted_at, now);
        explanation.add(format!("time-decay x{decay:.3}"));
        let mut score = base_score * decay;

        score = apply_context_boost(options, &item, &mut explanation, score);

        results.push(SearchResult::new(item, score, explanation));
    }

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(results)
}

/// Degraded path used when lexical/post-join retrieval fails: vector
/// search only, no fulltext, no observation attribution, no relation
/// filtering.
async fn vector_only_pipeline(
    options: &SearchOptions,
    now: DateTime<Utc>,
    storage: &dyn StorageBackend,
    query_embedding: &[f32],
    used_zero_vector: bool,
) -> Result<Vec<SearchResult>> {
    let k = candidate_k(options.limit);
    let use_name_index = options.prefers_name_index();
    let hits = storage.vector_search(query_embedding, use_name_index, k).await?;

    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(entity) = storage.get_entity(hit.entity_id).await? else {
            continue;
        };
        if !entity.is_asserted_at(now) {
            continue;
        }
        if !passes_kind_filter(options, &entity) || !passes_metadata_filter(options, &entity) {
            continue;
        }
        let asserted_at = entity.validity.asserted_at;
        let mut explanation = Explanation::default();
        explanation.used_zero_vector = used_zero_vector;
        explanation.add(format!("vector: {:.3}", hit.raw_score));
        explanation.add("degraded: vector-only fallback");
        let decay = time_decay_factor(asserted_at, now);
        explanation.add(format!("time-decay x{decay:.3}"));
        let score = hit.raw_score * decay;
        results.push(SearchResult::new(MatchedItem::Entity(entity), score, explanation));
    }
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(results)
}

pub(crate) async fn apply_rerank(reranker: &RerankerService, query: &str, results: Vec<SearchResult>) -> Vec<SearchResult> {
    if results.is_empty() {
        return results;
    }
    let docs: Vec<String> = results.iter().map(rerank_doc).collect();
    let reranked = reranker.rerank(query, &docs).await;

    reranked
        .into_iter()
        .filter_map(|ranked| {
            let mut result = results.get(ranked.index)?.clone();
            result
                .explanation
                .add(format!("Reranked: cross-encoder score {:.3}", ranked.score));
            result.score = ranked.score.clamp(0.0, 1.0);
            Some(result)
        })
        .collect()
}

fn rerank_doc(result: &SearchResult) -> String {
    match &result.item {
        MatchedItem::Entity(e) => format!("{} | {} | {}", e.name, e.kind, e.content_text()),
        MatchedItem::Observation(o) => o.text.clone(),
    }
}

pub(crate) fn passes_kind_filter(options: &SearchOptions, entity: &Entity) -> bool {
    options.kinds.is_empty() || options.kinds.contains(&entity.kind)
}

pub(crate) fn passes_metadata_filter(options: &SearchOptions, entity: &Entity) -> bool {
    options
        .metadata
        .iter()
        .all(|(k, v)| entity.metadata.get(k) == Some(v))
}

pub(crate) fn passes_time_range(options: &SearchOptions, entity: &Entity, now: DateTime<Utc>) -> bool {
    match options.time_range_hours {
        Some(hours) => {
            let window = chrono::Duration::milliseconds((hours * 3_600_000.0) as i64);
            now - entity.validity.asserted_at <= window
        }
        None => true,
    }
}

async fn has_required_relation(
    storage: &dyn StorageBackend,
    entity_id: Uuid,
    required: &[String],
    now: DateTime<Utc>,
) -> Result<bool> {
    let relationships = storage.relationships_for_entity(entity_id).await?;
    Ok(relationships
        .iter()
        .any(|r| r.validity.is_visible_at(now) && required.contains(&r.relation_type)))
}

/// Choose the most relevant item for `entity`: the entity itself, or
/// whichever live observation has the highest lexical overlap with the
/// query, if that beats the entity's own name overlap. Ties among
/// observations break in favour of the one matching the query's
/// session/task context (§4.5 step 6 is about scoring, but a tie with no
/// context preference would be an arbitrary pick). Returns the item plus
/// the timestamp to use for time-decay.
fn best_match(
    options: &SearchOptions,
    entity: Entity,
    observations: Vec<Observation>,
    now: DateTime<Utc>,
) -> (MatchedItem, DateTime<Utc>) {
    let tokens = tokenize(&options.query);
    let entity_score = token_overlap(&tokens, &entity.name.to_lowercase());
    let entity_asserted_at = entity.validity.asserted_at;

    let best_observation = observations
        .into_iter()
        .filter(|o| o.is_asserted_at(now))
        .map(|o| {
            let score = token_overlap(&tokens, &o.text.to_lowercase());
            let context_rank = context_match_rank(options, &o);
            (score, context_rank, o)
        })
        .max_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    match best_observation {
        Some((score, _, observation)) if score > entity_score => {
            let asserted_at = observation.validity.asserted_at;
            (MatchedItem::Observation(observation), asserted_at)
        }
        _ => (MatchedItem::Entity(entity), entity_asserted_at),
    }
}

/// Tie-break rank: `2` if both session and task match the query context,
/// `1` if exactly one does, `0` otherwise.
fn context_match_rank(options: &SearchOptions, observation: &Observation) -> u8 {
    let session_match = options.session_id.is_some() && observation.session_id == options.session_id;
    let task_match = options.task_id.is_some() && observation.task_id == options.task_id;
    u8::from(session_match) + u8::from(task_match)
}

fn tokenize(query: &str) -> Vec<String> {
    query.to_lowercase().split_whitespace().map(str::to_string).collect()
}

fn token_overlap(tokens: &[String], haystack: &str) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    let matched = tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
    matched as f32 / tokens.len() as f32
}

/// Exponential time-decay with a 90-day half-life (§4.5 step 5), shared by
/// graph-RAG and multi-hop aggregation.
pub(crate) fn time_decay_factor(asserted_at: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let age_days = (now - asserted_at).num_seconds().max(0) as f64 / 86_400.0;
    0.5_f64.powf(age_days / defaults::TIME_DECAY_HALF_LIFE_DAYS) as f32
}

/// Apply the session/task context-boost (§4.5 step 6), capping the result
/// at [`defaults::MAX_FUSED_SCORE`].
fn apply_context_boost(
    options: &SearchOptions,
    item: &MatchedItem,
    explanation: &mut Explanation,
    score: f32,
) -> f32 {
    let MatchedItem::Observation(observation) = item else {
        return score;
    };
    let mut boosted = score;
    if options.session_id.is_some() && observation.session_id == options.session_id {
        boosted *= defaults::SESSION_BOOST_FACTOR;
        explanation.add(format!("context-boost: session match x{}", defaults::SESSION_BOOST_FACTOR));
    }
    if options.task_id.is_some() && observation.task_id == options.task_id {
        boosted *= defaults::TASK_BOOST_FACTOR;
        explanation.add(format!("context-boost: task match x{}", defaults::TASK_BOOST_FACTOR));
    }
    boosted.min(defaults::MAX_FUSED_SCORE)
}
