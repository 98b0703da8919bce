//! Entities: typed named nodes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validity::Validity;

/// A typed, named node in the associative memory graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Opaque identifier, stable across retractions.
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// Free-form type tag (e.g. "Person", "Project").
    pub kind: String,
    /// Free-form key/value metadata.
    pub metadata: HashMap<String, String>,
    /// Embedding of `name + description`-derived content. `None` before the
    /// embedding service has processed the entity.
    pub content_embedding: Option<Vec<f32>>,
    /// Embedding of `name` alone, used for short-query lookups.
    pub name_embedding: Option<Vec<f32>>,
    /// Bi-temporal validity.
    pub validity: Validity,
}

impl Entity {
    /// Construct a new, freshly-asserted entity with no embeddings yet.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: kind.into(),
            metadata: HashMap::new(),
            content_embedding: None,
            name_embedding: None,
            validity: Validity::asserted_at(now),
        }
    }

    /// Whether this entity is visible ("asserted") at time `t`.
    #[must_use]
    pub fn is_asserted_at(&self, t: DateTime<Utc>) -> bool {
        self.validity.is_visible_at(t)
    }

    /// Text used to derive the content embedding: name plus any
    /// `description` metadata field, matching the temporal-embedding
    /// synthesiser's `content` component definition.
    #[must_use]
    pub fn content_text(&self) -> String {
        match self.metadata.get("description") {
            Some(desc) if !desc.is_empty() => format!("{} {}", self.name, desc),
            _ => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entity_is_asserted_immediately() {
        let now = Utc::now();
        let e = Entity::new("Alice", "Person", now);
        assert!(e.is_asserted_at(now));
        assert_eq!(e.kind, "Person");
    }

    #[test]
    fn content_text_falls_back_to_name() {
        let e = Entity::new("Bob", "Person", Utc::now());
        assert_eq!(e.content_text(), "Bob");
    }

    #[test]
    fn content_text_includes_description() {
        let mut e = Entity::new("ProjectX", "Project", Utc::now());
        e.metadata
            .insert("description".to_string(), "a greenfield rewrite".to_string());
        assert_eq!(e.content_text(), "ProjectX a greenfield rewrite");
    }
}
