//! End-to-end scenarios 1-4: entity creation and graph-RAG reachability,
//! observation reranking, task-context boosting, and adaptive strategy
//! persistence across repeated queries.

mod common;

use chrono::Utc;
use memory_core::storage::WriteOp;
use memory_core::types::{AdaptiveOptions, Observation, SearchOptions};

#[tokio::test]
async fn alice_bob_project_x_search_and_graph_rag() {
    let h = common::harness();
    let now = Utc::now();

    let alice = h.memory.remember_entity("Alice", "Person", now).await.unwrap();
    let _bob = h.memory.remember_entity("Bob", "Person", now).await.unwrap();
    let project_x = h.memory.remember_entity("ProjectX", "Project", now).await.unwrap();
    h.memory.relate(alice, project_x, "works_on", 0.9, now).await.unwrap();
    h.memory.relate(_bob, project_x, "works_on", 0.9, now).await.unwrap();

    let options = SearchOptions {
        limit: 5,
        ..SearchOptions::new("Alice")
    };
    let results = h.memory.search(&options, now).await.unwrap();
    assert_eq!(results[0].entity_id(), alice, "Alice should rank first for her own name");

    let mut graph_options = SearchOptions::new("Alice");
    graph_options.graph_constraints.max_depth = 1;
    let graph_results = h.memory.graph_rag(&graph_options, now).await.unwrap();
    assert!(
        graph_results.iter().any(|r| r.entity_id() == project_x),
        "ProjectX should be reachable from Alice in one hop"
    );
}

#[tokio::test]
async fn reranked_observation_surfaces_the_typescript_preference() {
    let h = common::harness();
    let now = Utc::now();

    let alice = h.memory.remember_entity("Alice", "Person", now).await.unwrap();
    h.memory
        .observe(alice, "Alice prefers TypeScript", now)
        .await
        .unwrap();

    let options = SearchOptions {
        rerank: true,
        ..SearchOptions::new("what does Alice prefer")
    };
    let results = h.memory.search(&options, now).await.unwrap();

    let top = results.first().expect("expected at least one result");
    let text = match &top.item {
        memory_core::types::MatchedItem::Observation(o) => o.text.clone(),
        memory_core::types::MatchedItem::Entity(e) => e.name.clone(),
    };
    assert!(text.contains("TypeScript"), "top result should mention TypeScript, got {text:?}");
    assert!(top.explanation.was_reranked());
}

#[tokio::test]
async fn matching_task_id_strictly_boosts_the_score() {
    let h = common::harness();
    let now = Utc::now();

    let alice = h.memory.remember_entity("Alice", "Person", now).await.unwrap();

    let mut observation = Observation::new(alice, "Alice prefers TypeScript", now);
    observation.task_id = Some("T1".to_string());
    let embedded = memory_core::embeddings::EmbeddingService::new(Box::new(
        memory_core::embeddings::MockEmbeddingProvider::new(32),
    ))
    .embed(&observation.text)
    .await;
    observation.text_embedding = Some(embedded.vector);
    h.storage
        .transaction(vec![WriteOp::PutObservation(observation)], now)
        .await
        .unwrap();

    let without_task = SearchOptions::new("what does Alice prefer");
    let with_task = SearchOptions {
        task_id: Some("T1".to_string()),
        ..SearchOptions::new("what does Alice prefer")
    };

    let baseline = h.memory.search(&without_task, now).await.unwrap();
    let boosted = h.memory.search(&with_task, now).await.unwrap();

    let baseline_score = baseline.first().map(|r| r.score).unwrap_or(0.0);
    let boosted_score = boosted.first().map(|r| r.score).unwrap_or(0.0);
    assert!(
        boosted_score > baseline_score,
        "task-matched score {boosted_score} should exceed baseline {baseline_score}"
    );
    let ratio = boosted_score / baseline_score.max(1e-6);
    assert!(
        ratio > 1.0 && ratio <= 1.5 + 1e-3,
        "boost ratio {ratio} should fall in (1.0, 1.5]"
    );
}

#[tokio::test]
async fn repeated_simple_queries_accumulate_strategy_performance() {
    let mut adaptive_options = AdaptiveOptions::default();
    adaptive_options.exploration_rate = 0.0;
    let h = common::harness();
    let memory = h.memory.with_adaptive_options(adaptive_options);
    let now = Utc::now();
    memory.remember_entity("Alice", "Person", now).await.unwrap();

    let options = SearchOptions::new("Alice");
    let mut chosen_strategy = None;
    for i in 0..3 {
        let (strategy, _results) = memory.adaptive_search(&options, now).await.unwrap();
        chosen_strategy = Some(strategy);
        memory
            .record_strategy_outcome(strategy, 0.9, 0.1, 5.0, i + 1, now)
            .await
            .unwrap();
    }

    let strategy = chosen_strategy.expect("at least one strategy should have fired");
    let row = h
        .storage
        .get_strategy_performance(strategy)
        .await
        .unwrap()
        .expect("performance row should exist after three queries");
    assert!(row.total_count >= 3);
}
