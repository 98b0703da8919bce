//! Observations: text attached to an entity.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validity::Validity;

/// A unit of text ingested against an entity; the primary lexical/semantic
/// search target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Opaque identifier.
    pub id: Uuid,
    /// Weak reference to the owning entity: a relation and lookup key,
    /// never an ownership edge.
    pub entity_id: Uuid,
    /// The observed text.
    pub text: String,
    /// Embedding of `text`. `None` before the embedding service runs.
    pub text_embedding: Option<Vec<f32>>,
    /// Free-form metadata.
    pub metadata: HashMap<String, String>,
    /// Session context active when the observation was recorded, used to
    /// boost retrieval for the same session.
    pub session_id: Option<String>,
    /// Task context active when the observation was recorded.
    pub task_id: Option<String>,
    /// Bi-temporal validity.
    pub validity: Validity,
}

impl Observation {
    /// Construct a new, freshly-asserted observation with no embedding yet.
    #[must_use]
    pub fn new(entity_id: Uuid, text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id,
            text: text.into(),
            text_embedding: None,
            metadata: HashMap::new(),
            session_id: None,
            task_id: None,
            validity: Validity::asserted_at(now),
        }
    }

    /// Whether this observation is visible at time `t`.
    #[must_use]
    pub fn is_asserted_at(&self, t: DateTime<Utc>) -> bool {
        self.validity.is_visible_at(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_observation_carries_entity_reference() {
        let entity_id = Uuid::new_v4();
        let now = Utc::now();
        let o = Observation::new(entity_id, "Alice prefers TypeScript", now);
        assert_eq!(o.entity_id, entity_id);
        assert!(o.is_asserted_at(now));
    }
}
