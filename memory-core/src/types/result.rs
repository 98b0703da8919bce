//! Ranked result types returned by every retrieval operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::Entity;
use super::observation::Observation;

/// What a [`SearchResult`] actually matched on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::large_enum_variant)]
pub enum MatchedItem {
    /// Matched on an entity's name/content.
    Entity(Entity),
    /// Matched on an observation's text.
    Observation(Observation),
}

impl MatchedItem {
    /// The entity id this result is ultimately about (the observation's
    /// owner, for observation matches).
    #[must_use]
    pub fn entity_id(&self) -> Uuid {
        match self {
            MatchedItem::Entity(e) => e.id,
            MatchedItem::Observation(o) => o.entity_id,
        }
    }
}

/// A human-readable record of why a result scored the way it did, so a
/// caller (or test) can assert on provenance without re-deriving it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Explanation {
    /// Ordered list of notes, e.g. `"vector: 0.82"`, `"time-decay x0.91"`,
    /// `"context-boost: task match x1.5"`, `"Reranked"`.
    pub notes: Vec<String>,
    /// Whether the embedding used to score this candidate was a fail-soft
    /// zero vector (embedding service was unavailable).
    pub used_zero_vector: bool,
}

impl Explanation {
    /// Append a note.
    pub fn add(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Whether any note mentions reranking, matching scenario 2's
    /// `"explanation mentions Reranked"` assertion.
    #[must_use]
    pub fn was_reranked(&self) -> bool {
        self.notes.iter().any(|n| n.contains("Reranked"))
    }
}

/// A single ranked result. `score` is always in `[0, 1]` (P4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matched entity or observation.
    pub item: MatchedItem,
    /// Final fused/decayed/boosted/reranked score, clamped to `[0, 1]`.
    pub score: f32,
    /// Provenance of the score.
    pub explanation: Explanation,
}

impl SearchResult {
    /// Construct a result, clamping the score into `[0, 1]` (P4).
    #[must_use]
    pub fn new(item: MatchedItem, score: f32, explanation: Explanation) -> Self {
        Self {
            item,
            score: score.clamp(0.0, 1.0),
            explanation,
        }
    }

    /// The underlying entity id.
    #[must_use]
    pub fn entity_id(&self) -> Uuid {
        self.item.entity_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn score_is_clamped_into_unit_interval() {
        let e = Entity::new("Alice", "Person", Utc::now());
        let r = SearchResult::new(MatchedItem::Entity(e), 1.7, Explanation::default());
        assert!((0.0..=1.0).contains(&r.score));
        assert_eq!(r.score, 1.0);
    }

    #[test]
    fn explanation_reports_rerank() {
        let mut ex = Explanation::default();
        ex.add("Reranked: cross-encoder score 0.91");
        assert!(ex.was_reranked());
    }
}
