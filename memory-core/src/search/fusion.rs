//! Reciprocal Rank Fusion (§4.5, GLOSSARY "RRF"): combine several
//! independently-ranked id lists into one score per id,
//! `score(id) = Σ_list weight / (k + rank)`, 1-indexed rank.

use std::collections::HashMap;

use uuid::Uuid;

/// Fuse ranked id lists (each already sorted best-first) into a single
/// score map. `lists` pairs a list with its fusion weight.
#[must_use]
pub fn rrf_fuse(lists: &[(Vec<Uuid>, f64)], k: f64) -> HashMap<Uuid, f64> {
    let mut scores: HashMap<Uuid, f64> = HashMap::new();
    for (list, weight) in lists {
        for (idx, id) in list.iter().enumerate() {
            let rank = (idx + 1) as f64;
            *scores.entry(*id).or_insert(0.0) += weight / (k + rank);
        }
    }
    scores
}

/// Min-max normalise a score map into `[0, 1]`. A map with a single
/// distinct value (or no entries) maps every score to `1.0`.
#[must_use]
pub fn normalize(scores: &HashMap<Uuid, f64>) -> HashMap<Uuid, f32> {
    let max = scores.values().copied().fold(f64::MIN, f64::max);
    let min = scores.values().copied().fold(f64::MAX, f64::min);
    let span = max - min;
    scores
        .iter()
        .map(|(id, s)| {
            let normalised = if span > 1e-12 { (s - min) / span } else { 1.0 };
            (*id, normalised as f32)
        })
        .collect()
}
