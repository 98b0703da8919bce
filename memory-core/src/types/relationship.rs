//! Relationships: typed, weighted, directed edges between entities.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

use super::validity::Validity;

/// A typed, weighted, directed edge between two entities.
///
/// The `(from_id, to_id, relation_type)` triple is the logical key;
/// `relation_type` is a free-form string rather than a closed enum, so
/// callers can introduce new relation tags (e.g. `"works_on"`,
/// `"same_category"`) without a schema change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Source entity id.
    pub from_id: Uuid,
    /// Destination entity id.
    pub to_id: Uuid,
    /// Free-form relation tag.
    pub relation_type: String,
    /// Edge weight in `[0, 1]`.
    pub strength: f32,
    /// Free-form metadata.
    pub metadata: HashMap<String, String>,
    /// Bi-temporal validity.
    pub validity: Validity,
}

impl Relationship {
    /// Construct a new relationship, rejecting self-loops and out-of-range
    /// strength at the boundary per the data model's invariants.
    pub fn new(
        from_id: Uuid,
        to_id: Uuid,
        relation_type: impl Into<String>,
        strength: f32,
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        if from_id == to_id {
            return Err(Error::self_loop(from_id));
        }
        if !(0.0..=1.0).contains(&strength) {
            return Err(Error::strength_out_of_range(strength));
        }
        Ok(Self {
            from_id,
            to_id,
            relation_type: relation_type.into(),
            strength,
            metadata: HashMap::new(),
            validity: Validity::asserted_at(now),
        })
    }

    /// Whether this relationship is visible at time `t`.
    #[must_use]
    pub fn is_asserted_at(&self, t: DateTime<Utc>) -> bool {
        self.validity.is_visible_at(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_self_loop() {
        let id = Uuid::new_v4();
        let err = Relationship::new(id, id, "works_on", 0.5, Utc::now()).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn rejects_strength_out_of_range() {
        let err =
            Relationship::new(Uuid::new_v4(), Uuid::new_v4(), "works_on", 1.5, Utc::now())
                .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn accepts_valid_relationship() {
        let r = Relationship::new(Uuid::new_v4(), Uuid::new_v4(), "works_on", 0.9, Utc::now())
            .unwrap();
        assert_eq!(r.relation_type, "works_on");
    }
}
