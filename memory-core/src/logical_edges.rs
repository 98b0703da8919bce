//! Logical-edge derivation (§4.9): candidate relationships inferred from an
//! entity's metadata and one-hop neighbourhood, rather than explicitly
//! asserted by a caller.
//!
//! Candidates are deduplicated by key and materialisation into real
//! relationships is idempotent, so deriving the same candidates twice and
//! materialising both batches never produces duplicate edges.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::constants::{defaults, logging};
use crate::error::Result;
use crate::storage::{StorageBackend, WriteOp};
use crate::types::Relationship;

/// A candidate relationship inferred by one of the five derivation patterns,
/// not yet materialised into storage.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalEdge {
    pub from_id: Uuid,
    pub to_id: Uuid,
    pub relation_type: &'static str,
    pub confidence: f32,
}

/// Derive every candidate logical edge outgoing from `entity_id`: same
/// category, same kind, hierarchical (`parent_id` metadata, both
/// directions), same domain, and transitive (one hop out, then same
/// category/kind as the neighbour). Deduplicated by `(to_id, relation_type)`,
/// keeping the highest-confidence entry.
#[tracing::instrument(skip(storage), fields(prefix = logging::PREFIX_LOGICAL_EDGES, entity_id = %entity_id))]
pub async fn derive(entity_id: Uuid, storage: &dyn StorageBackend, now: DateTime<Utc>) -> Result<Vec<LogicalEdge>> {
    let Some(entity) = storage.get_entity(entity_id).await? else {
        return Ok(Vec::new());
    };
    if !entity.is_asserted_at(now) {
        return Ok(Vec::new());
    }

    let all = storage.all_entities().await?;
    let mut candidates: Vec<LogicalEdge> = Vec::new();

    let category = entity.metadata.get("category");
    let domain = entity.metadata.get("domain");

    for other in &all {
        if other.id == entity_id || !other.is_asserted_at(now) {
            continue;
        }
        if category.is_some() && other.metadata.get("category") == category {
            candidates.push(LogicalEdge {
                from_id: entity_id,
                to_id: other.id,
                relation_type: "same_category",
                confidence: defaults::LOGICAL_EDGE_SAME_CATEGORY_CONFIDENCE,
            });
        }
        if other.kind == entity.kind {
            candidates.push(LogicalEdge {
                from_id: entity_id,
                to_id: other.id,
                relation_type: "same_kind",
                confidence: defaults::LOGICAL_EDGE_SAME_KIND_CONFIDENCE,
            });
        }
        if domain.is_some() && other.metadata.get("domain") == domain {
            candidates.push(LogicalEdge {
                from_id: entity_id,
                to_id: other.id,
                relation_type: "same_domain",
                confidence: defaults::LOGICAL_EDGE_CONTEXTUAL_CONFIDENCE,
            });
        }
    }

    if let Some(parent_id) = entity
        .metadata
        .get("parent_id")
        .and_then(|s| Uuid::parse_str(s).ok())
    {
        if let Some(parent) = storage.get_entity(parent_id).await? {
            if parent.is_asserted_at(now) {
                candidates.push(LogicalEdge {
                    from_id: entity_id,
                    to_id: parent_id,
                    relation_type: "child_of",
                    confidence: defaults::LOGICAL_EDGE_HIERARCHICAL_CONFIDENCE,
                });
            }
        }
    }
    for other in &all {
        if other.id == entity_id || !other.is_asserted_at(now) {
            continue;
        }
        let points_here = other
            .metadata
            .get("parent_id")
            .and_then(|s| Uuid::parse_str(s).ok())
            == Some(entity_id);
        if points_here {
            candidates.push(LogicalEdge {
                from_id: entity_id,
                to_id: other.id,
                relation_type: "parent_of",
                confidence: defaults::LOGICAL_EDGE_HIERARCHICAL_CONFIDENCE,
            });
        }
    }

    let relationships = storage.relationships_for_entity(entity_id).await?;
    for rel in &relationships {
        if !rel.validity.is_visible_at(now) {
            continue;
        }
        let neighbour_id = if rel.from_id == entity_id { rel.to_id } else { rel.from_id };
        let Some(neighbour) = storage.get_entity(neighbour_id).await? else {
            continue;
        };
        if !neighbour.is_asserted_at(now) {
            continue;
        }
        for other in &all {
            if other.id == entity_id || other.id == neighbour_id || !other.is_asserted_at(now) {
                continue;
            }
            let same_category = neighbour.metadata.get("category").is_some()
                && neighbour.metadata.get("category") == other.metadata.get("category");
            if same_category {
                candidates.push(LogicalEdge {
                    from_id: entity_id,
                    to_id: other.id,
                    relation_type: "transitive_category",
                    confidence: defaults::LOGICAL_EDGE_TRANSITIVE_CATEGORY_CONFIDENCE,
                });
            }
            if other.kind == neighbour.kind {
                candidates.push(LogicalEdge {
                    from_id: entity_id,
                    to_id: other.id,
                    relation_type: "transitive_kind",
                    confidence: defaults::LOGICAL_EDGE_TRANSITIVE_KIND_CONFIDENCE,
                });
            }
        }
    }

    Ok(dedup_keep_highest(candidates))
}

fn dedup_keep_highest(candidates: Vec<LogicalEdge>) -> Vec<LogicalEdge> {
    let mut best: HashMap<(Uuid, &'static str), LogicalEdge> = HashMap::new();
    for edge in candidates {
        let key = (edge.to_id, edge.relation_type);
        match best.get(&key) {
            Some(existing) if existing.confidence >= edge.confidence => {}
            _ => {
                best.insert(key, edge);
            }
        }
    }
    best.into_values().collect()
}

/// Materialise candidate edges into real relationships, skipping any
/// `(from, to, relation_type)` already present so repeated calls are
/// idempotent. Returns the number of relationships actually written.
#[tracing::instrument(skip(storage, edges), fields(prefix = logging::PREFIX_LOGICAL_EDGES))]
pub async fn materialize(
    storage: &dyn StorageBackend,
    edges: Vec<LogicalEdge>,
    now: DateTime<Utc>,
) -> Result<usize> {
    let mut ops = Vec::new();
    for edge in edges {
        let existing = storage.relationships_for_entity(edge.from_id).await?;
        let already_present = existing.iter().any(|r| {
            r.from_id == edge.from_id
                && r.to_id == edge.to_id
                && r.relation_type == edge.relation_type
                && r.validity.is_visible_at(now)
        });
        if already_present {
            continue;
        }
        let relationship = Relationship::new(edge.from_id, edge.to_id, edge.relation_type, edge.confidence, now)?;
        ops.push(WriteOp::PutRelationship(relationship));
    }
    let written = ops.len();
    if written > 0 {
        storage.transaction(ops, now).await?;
    }
    Ok(written)
}
