//! Adaptive-strategy-selector types: complexity classes, strategy names,
//! and the persisted per-strategy performance row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the five retrieval strategies the adaptive selector chooses among.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyName {
    VectorOnly,
    GraphWalk,
    HybridFusion,
    CommunityExpansion,
    SemanticWalk,
}

impl StrategyName {
    /// All strategies, in the fixed insertion order used to break ties.
    #[must_use]
    pub fn all() -> [StrategyName; 5] {
        [
            StrategyName::VectorOnly,
            StrategyName::GraphWalk,
            StrategyName::HybridFusion,
            StrategyName::CommunityExpansion,
            StrategyName::SemanticWalk,
        ]
    }

    /// Stable string form, used as the `strategy_performance` table key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyName::VectorOnly => "VECTOR_ONLY",
            StrategyName::GraphWalk => "GRAPH_WALK",
            StrategyName::HybridFusion => "HYBRID_FUSION",
            StrategyName::CommunityExpansion => "COMMUNITY_EXPANSION",
            StrategyName::SemanticWalk => "SEMANTIC_WALK",
        }
    }
}

/// Query-complexity classification used to bias strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryComplexity {
    Simple,
    Moderate,
    Complex,
    Exploratory,
}

impl QueryComplexity {
    /// The strategy this complexity class prefers, per §4.8's preference
    /// table. `Complex` prefers either `GraphWalk` or `SemanticWalk`; this
    /// returns `GraphWalk` as the primary preference and the caller may
    /// also boost `SemanticWalk` via [`QueryComplexity::secondary_preference`].
    #[must_use]
    pub fn preferred_strategy(self) -> StrategyName {
        match self {
            QueryComplexity::Simple => StrategyName::VectorOnly,
            QueryComplexity::Moderate => StrategyName::HybridFusion,
            QueryComplexity::Complex => StrategyName::GraphWalk,
            QueryComplexity::Exploratory => StrategyName::CommunityExpansion,
        }
    }

    /// A second strategy eligible for the complexity-preference multiplier,
    /// only non-empty for `Complex` (which names two strategies in §4.8).
    #[must_use]
    pub fn secondary_preference(self) -> Option<StrategyName> {
        match self {
            QueryComplexity::Complex => Some(StrategyName::SemanticWalk),
            _ => None,
        }
    }
}

/// Persisted per-strategy performance statistics (§3 "Strategy-performance
/// row"), updated after every retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyPerformance {
    pub strategy: StrategyName,
    pub success_count: u64,
    pub total_count: u64,
    pub avg_f1: f32,
    pub avg_cost: f32,
    pub avg_latency_ms: f32,
    pub last_used: Option<DateTime<Utc>>,
}

impl StrategyPerformance {
    /// A fresh, never-used row for `strategy`.
    #[must_use]
    pub fn new(strategy: StrategyName) -> Self {
        Self {
            strategy,
            success_count: 0,
            total_count: 0,
            avg_f1: 0.0,
            avg_cost: 0.0,
            avg_latency_ms: 0.0,
            last_used: None,
        }
    }

    /// Success rate, or `None` if the strategy has never been used
    /// (callers should treat `None` as the neutral 0.5 prior per §4.8).
    #[must_use]
    pub fn success_rate(&self) -> Option<f32> {
        if self.total_count == 0 {
            None
        } else {
            Some(self.success_count as f32 / self.total_count as f32)
        }
    }

    /// Whether `last_used` falls within the recency window ending at `now`.
    #[must_use]
    pub fn used_recently(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.last_used.is_some_and(|t| now - t <= window)
    }

    /// Fold a new observation (success/failure, f1, cost, latency) into the
    /// running averages and bump the counts.
    pub fn record(
        &mut self,
        succeeded: bool,
        f1: f32,
        cost: f32,
        latency_ms: f32,
        now: DateTime<Utc>,
    ) {
        let n = self.total_count as f32;
        self.total_count += 1;
        if succeeded {
            self.success_count += 1;
        }
        let new_n = self.total_count as f32;
        self.avg_f1 = (self.avg_f1 * n + f1) / new_n;
        self.avg_cost = (self.avg_cost * n + cost) / new_n;
        self.avg_latency_ms = (self.avg_latency_ms * n + latency_ms) / new_n;
        self.last_used = Some(now);
    }
}
