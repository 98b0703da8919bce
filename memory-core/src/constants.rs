//! Global constants for the retrieval core.
//!
//! Centralizes magic numbers used throughout the crate so they have a
//! single place to live and are easy to audit and tune.

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    // Embedding service
    pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;
    pub const EMBEDDING_CACHE_SIZE: usize = 1000;
    pub const EMBEDDING_CACHE_TTL: Duration = Duration::from_secs(3600);

    // Retrieval cache
    pub const QUERY_CACHE_TTL: Duration = Duration::from_secs(300);
    /// TTL for the persisted `search_cache` tier, independent of (and
    /// longer-lived than) the in-memory TTL above: the persisted tier
    /// exists to survive an in-memory eviction or a restart, so it must
    /// not expire on the in-memory tier's shorter clock.
    pub const PERSISTED_QUERY_CACHE_TTL: Duration = Duration::from_secs(86_400);
    pub const SEMANTIC_NEAR_HIT_THRESHOLD: f32 = 0.95;

    // HNSW-equivalent index parameters (honored by real backends; the
    // in-memory reference backend ignores them and scans exhaustively)
    pub const HNSW_M: usize = 16;
    pub const HNSW_EF_CONSTRUCTION: usize = 200;

    // Hybrid search
    pub const RRF_K: f64 = 60.0;
    pub const TIME_DECAY_HALF_LIFE_DAYS: f64 = 90.0;
    pub const SESSION_BOOST_FACTOR: f32 = 1.3;
    pub const TASK_BOOST_FACTOR: f32 = 1.5;
    pub const MAX_FUSED_SCORE: f32 = 1.0;
    pub const SHORT_QUERY_TOKEN_THRESHOLD: usize = 3;

    // Graph-RAG
    pub const GRAPH_RAG_DEFAULT_MAX_DEPTH: usize = 2;
    pub const GRAPH_RAG_HARD_MAX_DEPTH: usize = 4;
    pub const GRAPH_RAG_DEPTH_ATTENUATION: f32 = 0.2;
    pub const GRAPH_RAG_SEED_MULTIPLIER: usize = 2;

    // Multi-hop pivot engine
    pub const MULTI_HOP_BRANCHING_FACTOR: usize = 5;
    pub const MULTI_HOP_MAX_PIVOT_DEPTH: usize = 3;
    pub const MULTI_HOP_MAX_NODES_EXPLORED: usize = 100;
    pub const MULTI_HOP_CONFIDENCE_THRESHOLD: f32 = 0.5;
    pub const MULTI_HOP_CONFIDENCE_DECAY_PER_HOP: f32 = 0.9;
    pub const MULTI_HOP_NEIGHBOUR_WEIGHT_SIMILARITY: f32 = 0.4;
    pub const MULTI_HOP_NEIGHBOUR_WEIGHT_STRENGTH: f32 = 0.3;
    pub const MULTI_HOP_NEIGHBOUR_WEIGHT_RANK: f32 = 0.3;
    pub const MULTI_HOP_HELPFULNESS_CONFIDENCE_WEIGHT: f32 = 0.6;
    pub const MULTI_HOP_HELPFULNESS_LENGTH_WEIGHT: f32 = 0.4;
    pub const MULTI_HOP_LENGTH_PENALTY_K: f32 = 0.1;
    /// Fallback used where a candidate's PageRank is unknown. Zero is
    /// chosen over a neutral prior so unranked nodes never outrank a
    /// measured low-rank node.
    pub const MULTI_HOP_FALLBACK_RANK: f32 = 0.0;

    // Adaptive strategy selector
    pub const ADAPTIVE_EXPLORATION_RATE: f32 = 0.1;
    pub const ADAPTIVE_SUCCESS_RATE_WEIGHT: f32 = 0.6;
    pub const ADAPTIVE_COST_WEIGHT: f32 = 0.3;
    pub const ADAPTIVE_RECENCY_BONUS: f32 = 0.1;
    pub const ADAPTIVE_RECENCY_WINDOW_SECS: i64 = 3600;
    pub const ADAPTIVE_COMPLEXITY_PREFERENCE_MULTIPLIER: f32 = 1.2;
    pub const ADAPTIVE_NEUTRAL_SCORE: f32 = 0.5;
    pub const PRA_DECAY_FACTOR: f32 = 0.8;
    pub const PRA_MIN_REWARD: f32 = 0.1;
    pub const CAF_COST_PENALTY: f32 = 0.15;

    // Logical edges
    pub const LOGICAL_EDGE_SAME_CATEGORY_CONFIDENCE: f32 = 0.8;
    pub const LOGICAL_EDGE_SAME_KIND_CONFIDENCE: f32 = 0.7;
    pub const LOGICAL_EDGE_HIERARCHICAL_CONFIDENCE: f32 = 0.9;
    pub const LOGICAL_EDGE_CONTEXTUAL_CONFIDENCE: f32 = 0.75;
    pub const LOGICAL_EDGE_TRANSITIVE_CATEGORY_CONFIDENCE: f32 = 0.6;
    pub const LOGICAL_EDGE_TRANSITIVE_KIND_CONFIDENCE: f32 = 0.55;

    // Temporal-embedding synthesiser
    pub const TEMPORAL_TIME_ENCODING_FREQUENCIES: usize = 32;
    pub const TEMPORAL_TIME_ENCODING_DIM: usize = 64;
    pub const TEMPORAL_MAX_AGE_YEARS: f64 = 10.0;
    pub const TEMPORAL_HISTORY_WINDOW: usize = 50;
    pub const TEMPORAL_HISTORY_DECAY_DAYS: f64 = 30.0;
    pub const TEMPORAL_NEIGHBOURHOOD_DECAY_DAYS: f64 = 30.0;
    pub const TEMPORAL_WEIGHT_CONTENT: f32 = 0.4;
    pub const TEMPORAL_WEIGHT_TIME: f32 = 0.2;
    pub const TEMPORAL_WEIGHT_HISTORY: f32 = 0.2;
    pub const TEMPORAL_WEIGHT_NEIGHBOURHOOD: f32 = 0.2;
    pub const TEMPORAL_CONFIDENCE_BASE: f32 = 0.5;
    pub const TEMPORAL_CONFIDENCE_AGE_UNDER_7D: f32 = 0.3;
    pub const TEMPORAL_CONFIDENCE_AGE_UNDER_30D: f32 = 0.2;
    pub const TEMPORAL_CONFIDENCE_AGE_UNDER_90D: f32 = 0.1;
    pub const TEMPORAL_CONFIDENCE_OBSERVATIONS_OVER_5: f32 = 0.15;
    pub const TEMPORAL_CONFIDENCE_OBSERVATIONS_OVER_0: f32 = 0.05;
    pub const TEMPORAL_CONFIDENCE_RELATIONSHIPS_OVER_10: f32 = 0.15;
    pub const TEMPORAL_CONFIDENCE_RELATIONSHIPS_OVER_0: f32 = 0.05;

    // Retry / resilience (ambient)
    pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Static error messages shared across variants.
pub mod errors {
    pub const ENTITY_NOT_FOUND: &str = "entity not found";
    pub const OBSERVATION_NOT_FOUND: &str = "observation not found";
    pub const RELATIONSHIP_NOT_FOUND: &str = "relationship not found";
    pub const SELF_LOOP_REJECTED: &str = "relationship endpoints must differ";
    pub const STRENGTH_OUT_OF_RANGE: &str = "relationship strength must be in [0, 1]";
    pub const DIMENSION_MISMATCH: &str = "embedding dimension does not match the configured dimension";
    pub const EMBEDDING_FAILED: &str = "embedding inference failed";
    pub const RERANK_FAILED: &str = "reranker inference failed";
}

/// Log message prefixes, matching the component they describe.
pub mod logging {
    pub const PREFIX_STORAGE: &str = "[storage]";
    pub const PREFIX_EMBEDDING: &str = "[embedding]";
    pub const PREFIX_RERANKER: &str = "[reranker]";
    pub const PREFIX_CACHE: &str = "[cache]";
    pub const PREFIX_SEARCH: &str = "[search]";
    pub const PREFIX_GRAPH_RAG: &str = "[graph-rag]";
    pub const PREFIX_MULTI_HOP: &str = "[multi-hop]";
    pub const PREFIX_ADAPTIVE: &str = "[adaptive]";
    pub const PREFIX_LOGICAL_EDGES: &str = "[logical-edges]";
    pub const PREFIX_TEMPORAL: &str = "[temporal]";
}

/// Environment variable names recognised at the façade boundary (§6).
pub mod env {
    pub const EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
    pub const RERANKER_MODEL: &str = "RERANKER_MODEL";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fusion_and_decay_constants_are_sane() {
        assert!(defaults::RRF_K > 0.0);
        assert!(defaults::TIME_DECAY_HALF_LIFE_DAYS > 0.0);
        assert!(defaults::SESSION_BOOST_FACTOR < defaults::TASK_BOOST_FACTOR);
    }

    #[test]
    fn temporal_fusion_weights_sum_to_one() {
        let sum = defaults::TEMPORAL_WEIGHT_CONTENT
            + defaults::TEMPORAL_WEIGHT_TIME
            + defaults::TEMPORAL_WEIGHT_HISTORY
            + defaults::TEMPORAL_WEIGHT_NEIGHBOURHOOD;
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn adaptive_weights_sum_close_to_one() {
        let sum = defaults::ADAPTIVE_SUCCESS_RATE_WEIGHT
            + defaults::ADAPTIVE_COST_WEIGHT
            + defaults::ADAPTIVE_RECENCY_BONUS;
        assert!(sum <= 1.0 + 1e-6);
    }
}
