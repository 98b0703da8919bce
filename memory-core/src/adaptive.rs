//! Adaptive strategy selection (§4.8): query-complexity classification,
//! epsilon-greedy strategy scoring, and the PRA/CAF reward shapers that feed
//! back into persisted [`StrategyPerformance`] rows.
//!
//! Each scoring function is `#[instrument]`-wrapped and logs its weighted
//! terms via `debug!` before combining them, so a strategy's score can be
//! reconstructed from logs alone.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, instrument};

use crate::constants::{defaults, logging};
use crate::error::Result;
use crate::storage::StorageBackend;
use crate::types::{AdaptiveOptions, QueryComplexity, StrategyName, StrategyPerformance};

/// Classify a query's complexity from simple lexical heuristics (§4.8):
/// short queries are simple, queries naming multiple entities or
/// relationship words are complex, open-ended wording is exploratory,
/// everything else is moderate.
#[must_use]
pub fn classify_complexity(query: &str) -> QueryComplexity {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    let lower = query.to_lowercase();

    const RELATIONSHIP_WORDS: &[&str] = &["related", "connected", "between", "relationship", "linked", "because"];
    const EXPLORATORY_WORDS: &[&str] = &["explore", "everything", "all about", "overview", "related to"];

    if EXPLORATORY_WORDS.iter().any(|w| lower.contains(w)) {
        return QueryComplexity::Exploratory;
    }
    if RELATIONSHIP_WORDS.iter().any(|w| lower.contains(w)) || tokens.len() > 12 {
        return QueryComplexity::Complex;
    }
    if tokens.len() <= defaults::SHORT_QUERY_TOKEN_THRESHOLD {
        return QueryComplexity::Simple;
    }
    QueryComplexity::Moderate
}

/// Score one strategy's persisted row against the epsilon-greedy formula:
/// `0.6*success_rate + 0.3*1/(1+avg_cost) + (0.1 if used recently)`, then
/// `x1.2` if `strategy` is the complexity class's (primary or secondary)
/// preference. Unused strategies score from [`defaults::ADAPTIVE_NEUTRAL_SCORE`].
#[instrument(skip(row), fields(prefix = logging::PREFIX_ADAPTIVE, strategy = row.strategy.as_str()))]
fn score_strategy(row: &StrategyPerformance, complexity: QueryComplexity, now: DateTime<Utc>) -> f32 {
    let success_rate = row.success_rate().unwrap_or(defaults::ADAPTIVE_NEUTRAL_SCORE);
    let cost_term = 1.0 / (1.0 + row.avg_cost);
    let recency_window = Duration::seconds(defaults::ADAPTIVE_RECENCY_WINDOW_SECS);
    let recency_bonus = if row.used_recently(now, recency_window) {
        defaults::ADAPTIVE_RECENCY_BONUS
    } else {
        0.0
    };

    let base = defaults::ADAPTIVE_SUCCESS_RATE_WEIGHT * success_rate
        + defaults::ADAPTIVE_COST_WEIGHT * cost_term
        + recency_bonus;

    let is_preferred = complexity.preferred_strategy() == row.strategy
        || complexity.secondary_preference() == Some(row.strategy);
    let score = if is_preferred {
        base * defaults::ADAPTIVE_COMPLEXITY_PREFERENCE_MULTIPLIER
    } else {
        base
    };

    debug!(
        success_rate = success_rate,
        cost_term = cost_term,
        recency_bonus = recency_bonus,
        is_preferred = is_preferred,
        score = score,
        "scored adaptive strategy candidate"
    );
    score
}

/// Select a strategy for `query` using epsilon-greedy exploration over the
/// persisted performance rows: with probability `options.exploration_rate`
/// pick a uniformly random strategy, otherwise the highest-scoring one
/// (ties broken by [`StrategyName::all`]'s insertion order).
#[instrument(skip(storage, options), fields(prefix = logging::PREFIX_ADAPTIVE, query = %query))]
pub async fn select_strategy(
    storage: &dyn StorageBackend,
    query: &str,
    options: &AdaptiveOptions,
    now: DateTime<Utc>,
) -> Result<StrategyName> {
    let complexity = classify_complexity(query);

    if rand::rng().random::<f32>() < options.exploration_rate {
        let choices = StrategyName::all();
        let idx = rand::rng().random_range(0..choices.len());
        debug!(strategy = choices[idx].as_str(), "epsilon-greedy random exploration");
        return Ok(choices[idx]);
    }

    let mut best: Option<(StrategyName, f32)> = None;
    for strategy in StrategyName::all() {
        let row = storage
            .get_strategy_performance(strategy)
            .await?
            .unwrap_or_else(|| StrategyPerformance::new(strategy));
        let score = score_strategy(&row, complexity, now);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((strategy, score));
        }
    }

    Ok(best.map(|(s, _)| s).unwrap_or(complexity.preferred_strategy()))
}

/// Progressive Retrieval Annealing reward: `max(0.1, decay_factor^(retrieval_count-1))`.
/// Repeated retrievals for the same query within a session are worth
/// progressively less, discouraging redundant re-querying.
#[must_use]
pub fn pra_reward(retrieval_count: u32, options: &AdaptiveOptions) -> f32 {
    let exponent = retrieval_count.saturating_sub(1) as i32;
    options.decay_factor.powi(exponent).max(defaults::PRA_MIN_REWARD)
}

/// Cost-Adjusted F1 reward: `f1 * exp(-cost_penalty*retrieval_count)`,
/// penalising strategies that only do well after many retrieval attempts.
#[must_use]
pub fn caf_reward(f1: f32, retrieval_count: u32, options: &AdaptiveOptions) -> f32 {
    f1 * (-options.cost_penalty * retrieval_count as f32).exp()
}

/// Load (or create) the performance row for `strategy`, fold in a new
/// observation, and persist it back.
#[instrument(skip(storage), fields(prefix = logging::PREFIX_ADAPTIVE, strategy = strategy.as_str()))]
pub async fn record_outcome(
    storage: &dyn StorageBackend,
    strategy: StrategyName,
    succeeded: bool,
    f1: f32,
    cost: f32,
    latency_ms: f32,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut row = storage
        .get_strategy_performance(strategy)
        .await?
        .unwrap_or_else(|| StrategyPerformance::new(strategy));
    row.record(succeeded, f1, cost, latency_ms, now);
    storage.put_strategy_performance(row).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    #[test]
    fn short_query_classifies_as_simple() {
        assert_eq!(classify_complexity("Alice"), QueryComplexity::Simple);
    }

    #[test]
    fn relationship_wording_classifies_as_complex() {
        assert_eq!(
            classify_complexity("how is Alice related to the NLP project"),
            QueryComplexity::Complex
        );
    }

    #[test]
    fn exploratory_wording_wins_over_length() {
        assert_eq!(
            classify_complexity("explore everything about the team"),
            QueryComplexity::Exploratory
        );
    }

    #[test]
    fn mid_length_plain_query_is_moderate() {
        assert_eq!(
            classify_complexity("what did Bob say about the release notes"),
            QueryComplexity::Moderate
        );
    }

    #[test]
    fn pra_reward_decays_then_floors() {
        let options = AdaptiveOptions::default();
        assert!((pra_reward(1, &options) - 1.0).abs() < 1e-6);
        assert!(pra_reward(5, &options) < pra_reward(2, &options));
        assert_eq!(pra_reward(50, &options), defaults::PRA_MIN_REWARD);
    }

    #[test]
    fn caf_reward_penalises_repeated_attempts() {
        let options = AdaptiveOptions::default();
        let once = caf_reward(0.9, 1, &options);
        let many = caf_reward(0.9, 10, &options);
        assert!(many < once);
    }

    #[tokio::test]
    async fn unused_strategies_select_deterministically_with_no_exploration() {
        let storage = InMemoryStorage::new();
        let now = Utc::now();
        let mut options = AdaptiveOptions::default();
        options.exploration_rate = 0.0;
        let chosen = select_strategy(&storage, "Alice", &options, now).await.unwrap();
        let chosen_again = select_strategy(&storage, "Alice", &options, now).await.unwrap();
        assert_eq!(chosen, chosen_again);
    }

    #[tokio::test]
    async fn strong_track_record_outweighs_complexity_preference() {
        let storage = InMemoryStorage::new();
        let now = Utc::now();
        let mut options = AdaptiveOptions::default();
        options.exploration_rate = 0.0;
        for _ in 0..10 {
            record_outcome(&storage, StrategyName::HybridFusion, true, 0.95, 0.1, 5.0, now)
                .await
                .unwrap();
        }
        let chosen = select_strategy(&storage, "Alice", &options, now).await.unwrap();
        assert_eq!(chosen, StrategyName::HybridFusion);
    }

    #[tokio::test]
    async fn record_outcome_persists_through_storage() {
        let storage = InMemoryStorage::new();
        let now = Utc::now();
        record_outcome(&storage, StrategyName::GraphWalk, false, 0.2, 1.0, 20.0, now)
            .await
            .unwrap();
        let row = storage
            .get_strategy_performance(StrategyName::GraphWalk)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.total_count, 1);
        assert_eq!(row.success_count, 0);
    }
}
