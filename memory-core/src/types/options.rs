//! Typed, enumerated option records for every public retrieval operation.
//!
//! The façade boundary described in §6/§9 translates runtime-dynamic option
//! maps into these structs on entry; everything below that boundary — this
//! crate — only ever sees typed structs.

use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// HNSW-equivalent query-time parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorParams {
    /// Search-time candidate list size (`ef_search`); larger is more
    /// accurate and slower. `None` lets the backend pick a default.
    pub ef_search: Option<usize>,
    /// Maximum cosine distance a candidate may have to be considered.
    pub radius: Option<f32>,
}

impl Default for VectorParams {
    fn default() -> Self {
        Self {
            ef_search: None,
            radius: None,
        }
    }
}

/// Graph-traversal constraints shared by hybrid search and graph-RAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConstraints {
    /// Maximum hop count. Graph-RAG defaults to 2, hard-capped at 4.
    pub max_depth: usize,
    /// If non-empty, only traverse edges whose `relation_type` is in this set.
    pub required_relations: Vec<String>,
    /// If non-empty, only keep paths that terminate at one of these entities.
    pub target_ids: Vec<uuid::Uuid>,
}

impl Default for GraphConstraints {
    fn default() -> Self {
        Self {
            max_depth: defaults::GRAPH_RAG_DEFAULT_MAX_DEPTH,
            required_relations: Vec::new(),
            target_ids: Vec::new(),
        }
    }
}

impl GraphConstraints {
    /// Clamp `max_depth` to the hard cap.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.max_depth = self.max_depth.min(defaults::GRAPH_RAG_HARD_MAX_DEPTH);
        self
    }
}

/// Options for [`crate::search::hybrid::search`] (§4.5) and, via the shared
/// fields, for [`crate::graph_rag::graph_rag`] (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Free-text query.
    pub query: String,
    /// Maximum number of results to return.
    pub limit: usize,
    /// Restrict to entities of these kinds (empty = no restriction).
    pub kinds: Vec<String>,
    /// Metadata key/value pairs a candidate entity must match.
    pub metadata: std::collections::BTreeMap<String, String>,
    /// Only include entities asserted within this many hours of now.
    pub time_range_hours: Option<f64>,
    /// Whether to run the cross-encoder reranker over the fused results.
    pub rerank: bool,
    /// Session context for the context-boost step.
    pub session_id: Option<String>,
    /// Task context for the context-boost step.
    pub task_id: Option<String>,
    /// Query-time vector index parameters.
    pub vector_params: VectorParams,
    /// Graph expansion constraints (used by graph-RAG; ignored by plain
    /// hybrid search beyond relation/target filtering of post-join results).
    pub graph_constraints: GraphConstraints,
}

impl SearchOptions {
    /// Construct minimal options for a plain text query.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: 10,
            kinds: Vec::new(),
            metadata: std::collections::BTreeMap::new(),
            time_range_hours: None,
            rerank: false,
            session_id: None,
            task_id: None,
            vector_params: VectorParams::default(),
            graph_constraints: GraphConstraints::default(),
        }
    }

    /// Whether the query is short enough (`<= 3` whitespace-delimited
    /// tokens) and kind-unfiltered to prefer the `name_embedding` index
    /// over `content_embedding`, per §4.5 step 3(a).
    #[must_use]
    pub fn prefers_name_index(&self) -> bool {
        self.kinds.is_empty()
            && self.query.split_whitespace().count() <= defaults::SHORT_QUERY_TOKEN_THRESHOLD
    }

    /// A cache fingerprint over the normalised, non-cosmetic fields: query,
    /// limit, filters, constraints, and vector parameters.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use std::fmt::Write as _;
        let mut s = String::new();
        let _ = write!(s, "q={}|l={}|k=", self.query.trim().to_lowercase(), self.limit);
        let mut kinds = self.kinds.clone();
        kinds.sort();
        let _ = write!(s, "{}|m=", kinds.join(","));
        for (k, v) in &self.metadata {
            let _ = write!(s, "{k}={v};");
        }
        let _ = write!(
            s,
            "|t={:?}|r={}|vp={:?}|gc={}:{}:{:?}",
            self.time_range_hours,
            self.rerank,
            self.vector_params,
            self.graph_constraints.max_depth,
            {
                let mut rel = self.graph_constraints.required_relations.clone();
                rel.sort();
                rel.join(",")
            },
            {
                let mut tgt = self.graph_constraints.target_ids.clone();
                tgt.sort();
                tgt
            }
        );
        s
    }
}

/// Options for [`crate::multihop::multi_hop`] (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiHopOptions {
    /// Requested hop bound; always clamped to `max_pivot_depth` internally.
    pub max_hops: usize,
    /// Number of HNSW pivots to retrieve.
    pub branching_factor: usize,
    /// Global cap on nodes explored across all pivots.
    pub max_nodes_explored: usize,
    /// Minimum decayed confidence required to keep exploring a candidate.
    pub confidence_threshold: f32,
    /// Per-pivot hop bound.
    pub max_pivot_depth: usize,
}

impl Default for MultiHopOptions {
    fn default() -> Self {
        Self {
            max_hops: defaults::MULTI_HOP_MAX_PIVOT_DEPTH,
            branching_factor: defaults::MULTI_HOP_BRANCHING_FACTOR,
            max_nodes_explored: defaults::MULTI_HOP_MAX_NODES_EXPLORED,
            confidence_threshold: defaults::MULTI_HOP_CONFIDENCE_THRESHOLD,
            max_pivot_depth: defaults::MULTI_HOP_MAX_PIVOT_DEPTH,
        }
    }
}

/// Options governing the adaptive strategy selector (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveOptions {
    /// Whether Progressive Retrieval Attenuation rewards are applied.
    pub enable_pra: bool,
    /// Whether Cost-Aware F1 rewards are applied.
    pub enable_caf: bool,
    /// ε for ε-greedy strategy selection.
    pub exploration_rate: f32,
    /// PRA decay factor.
    pub decay_factor: f32,
    /// CAF cost penalty.
    pub cost_penalty: f32,
    /// Hard cap on retrieval calls counted toward PRA/CAF decay.
    pub max_retrieval_calls: usize,
}

impl Default for AdaptiveOptions {
    fn default() -> Self {
        Self {
            enable_pra: true,
            enable_caf: true,
            exploration_rate: defaults::ADAPTIVE_EXPLORATION_RATE,
            decay_factor: defaults::PRA_DECAY_FACTOR,
            cost_penalty: defaults::CAF_COST_PENALTY,
            max_retrieval_calls: 1000,
        }
    }
}
