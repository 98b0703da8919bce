//! Temporal-embedding synthesiser (§4.10): a time-aware embedding fusing
//! content, Time2Vec-style time encoding, recent-observation history, and
//! neighbourhood context at a chosen timepoint.
//!
//! The time component uses a *fixed* sinusoidal Time2Vec encoding rather
//! than a learned adaptation matrix, since training an adapter is out of
//! scope here.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::constants::{defaults, logging};
use crate::embeddings::EmbeddingService;
use crate::error::Result;
use crate::math::{l2_normalize, weighted_mean};
use crate::storage::StorageBackend;

/// A time-aware embedding produced by [`synthesize`], plus the confidence
/// the synthesiser has in it.
#[derive(Debug, Clone)]
pub struct TemporalEmbedding {
    pub vector: Vec<f32>,
    pub confidence: f32,
}

/// Synthesise a temporal embedding for `entity_id` as of `at`. Returns
/// `None` if the entity doesn't exist or isn't asserted at `at`.
#[tracing::instrument(skip(storage, embeddings), fields(prefix = logging::PREFIX_TEMPORAL, entity_id = %entity_id))]
pub async fn synthesize(
    entity_id: Uuid,
    at: DateTime<Utc>,
    storage: &dyn StorageBackend,
    embeddings: &EmbeddingService,
) -> Result<Option<TemporalEmbedding>> {
    let Some(entity) = storage.get_entity(entity_id).await? else {
        return Ok(None);
    };
    if !entity.is_asserted_at(at) {
        return Ok(None);
    }

    let content_outcome = embeddings.embed(&entity.content_text()).await;
    let dim = content_outcome.vector.len().max(1);

    let age_days = (at - entity.validity.asserted_at).num_seconds() as f64 / 86_400.0;
    let time_component = resize(time2vec(age_days), dim);

    let observations = storage.observations_for_entity(entity_id).await?;
    let mut recent: Vec<_> = observations
        .iter()
        .filter(|o| o.is_asserted_at(at) && o.text_embedding.is_some())
        .collect();
    recent.sort_by(|a, b| b.validity.asserted_at.cmp(&a.validity.asserted_at));
    recent.truncate(defaults::TEMPORAL_HISTORY_WINDOW);
    let history_inputs: Vec<(Vec<f32>, f32)> = recent
        .iter()
        .map(|o| {
            let age = (at - o.validity.asserted_at).num_seconds() as f64 / 86_400.0;
            let weight = (-age / defaults::TEMPORAL_HISTORY_DECAY_DAYS).exp() as f32;
            (o.text_embedding.clone().unwrap(), weight)
        })
        .collect();
    let history_component = weighted_mean(&history_inputs).map_or_else(|| vec![0.0; dim], |v| resize(v, dim));

    let relationships = storage.relationships_for_entity(entity_id).await?;
    let mut neighbourhood_inputs: Vec<(Vec<f32>, f32)> = Vec::new();
    for rel in &relationships {
        if !rel.validity.is_visible_at(at) {
            continue;
        }
        let neighbour_id = if rel.from_id == entity_id { rel.to_id } else { rel.from_id };
        let Some(neighbour) = storage.get_entity(neighbour_id).await? else {
            continue;
        };
        if !neighbour.is_asserted_at(at) {
            continue;
        }
        let Some(name_embedding) = &neighbour.name_embedding else {
            continue;
        };
        let age = (at - rel.validity.asserted_at).num_seconds() as f64 / 86_400.0;
        let weight = rel.strength * (-age / defaults::TEMPORAL_NEIGHBOURHOOD_DECAY_DAYS).exp() as f32;
        neighbourhood_inputs.push((name_embedding.clone(), weight));
    }
    let neighbourhood_component =
        weighted_mean(&neighbourhood_inputs).map_or_else(|| vec![0.0; dim], |v| resize(v, dim));

    let content_component = resize(content_outcome.vector, dim);
    let mut fused = vec![0.0f32; dim];
    for i in 0..dim {
        fused[i] = defaults::TEMPORAL_WEIGHT_CONTENT * content_component[i]
            + defaults::TEMPORAL_WEIGHT_TIME * time_component[i]
            + defaults::TEMPORAL_WEIGHT_HISTORY * history_component[i]
            + defaults::TEMPORAL_WEIGHT_NEIGHBOURHOOD * neighbourhood_component[i];
    }
    l2_normalize(&mut fused);

    let confidence = confidence_for(age_days, recent.len(), relationships.len());

    Ok(Some(TemporalEmbedding { vector: fused, confidence }))
}

/// Sinusoidal Time2Vec-style encoding of an age in days: `D_t = 64` values
/// from 32 `(sin, cos)` pairs at frequencies `1 / 10000^(2i/D_t)`. Age is
/// clamped to roughly ten years so very old entities don't alias.
fn time2vec(age_days: f64) -> Vec<f32> {
    let max_age_days = defaults::TEMPORAL_MAX_AGE_YEARS * 365.25;
    let age = age_days.clamp(0.0, max_age_days);
    let d_t = defaults::TEMPORAL_TIME_ENCODING_DIM as f64;
    let mut out = Vec::with_capacity(defaults::TEMPORAL_TIME_ENCODING_DIM);
    for i in 0..defaults::TEMPORAL_TIME_ENCODING_FREQUENCIES {
        let freq = 1.0 / 10000f64.powf(2.0 * i as f64 / d_t);
        out.push((age * freq).sin() as f32);
        out.push((age * freq).cos() as f32);
    }
    out
}

/// Pad with zeros or truncate `v` to exactly `dim` entries.
fn resize(mut v: Vec<f32>, dim: usize) -> Vec<f32> {
    v.resize(dim, 0.0);
    v
}

/// Base 0.5, bonuses for recency/volume of observations/relationships,
/// capped at 1.0 (§4.10).
fn confidence_for(age_days: f64, observation_count: usize, relationship_count: usize) -> f32 {
    let mut confidence = defaults::TEMPORAL_CONFIDENCE_BASE;
    confidence += if age_days < 7.0 {
        defaults::TEMPORAL_CONFIDENCE_AGE_UNDER_7D
    } else if age_days < 30.0 {
        defaults::TEMPORAL_CONFIDENCE_AGE_UNDER_30D
    } else if age_days < 90.0 {
        defaults::TEMPORAL_CONFIDENCE_AGE_UNDER_90D
    } else {
        0.0
    };
    confidence += if observation_count > 5 {
        defaults::TEMPORAL_CONFIDENCE_OBSERVATIONS_OVER_5
    } else if observation_count > 0 {
        defaults::TEMPORAL_CONFIDENCE_OBSERVATIONS_OVER_0
    } else {
        0.0
    };
    confidence += if relationship_count > 10 {
        defaults::TEMPORAL_CONFIDENCE_RELATIONSHIPS_OVER_10
    } else if relationship_count > 0 {
        defaults::TEMPORAL_CONFIDENCE_RELATIONSHIPS_OVER_0
    } else {
        0.0
    };
    confidence.min(1.0)
}
