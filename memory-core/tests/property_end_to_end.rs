//! End-to-end checks for the invariants (§8 P1-P9) that are best verified
//! through the wired engine rather than a single module in isolation.

mod common;

use chrono::Utc;
use memory_core::types::SearchOptions;

#[tokio::test]
async fn p1_self_loop_relationships_are_rejected() {
    let h = common::harness();
    let now = Utc::now();
    let alice = h.memory.remember_entity("Alice", "Person", now).await.unwrap();
    let err = h.memory.relate(alice, alice, "knows", 0.5, now).await.unwrap_err();
    assert_eq!(err.kind(), "validation");
}

#[tokio::test]
async fn p2_observations_of_a_retracted_entity_stop_resolving_at_now() {
    let h = common::harness();
    let t0 = Utc::now();
    let alice = h.memory.remember_entity("Alice", "Person", t0).await.unwrap();
    h.memory.observe(alice, "Alice prefers TypeScript", t0).await.unwrap();

    let t1 = t0 + chrono::Duration::seconds(1);
    h.memory.retract_entity(alice, t1).await.unwrap();

    let t_now = t1 + chrono::Duration::seconds(1);
    let observations = h.storage.observations_for_entity(alice).await.unwrap();
    let entity = h.storage.get_entity(alice).await.unwrap().unwrap();
    for observation in &observations {
        if observation.is_asserted_at(t_now) {
            assert!(
                entity.is_asserted_at(t_now),
                "an observation visible at t must resolve to an entity also visible at t"
            );
        }
    }
}

#[tokio::test]
async fn p4_every_returned_score_is_within_the_unit_interval() {
    let h = common::harness();
    let now = Utc::now();
    let alice = h.memory.remember_entity("Alice", "Person", now).await.unwrap();
    let bob = h.memory.remember_entity("Bob", "Person", now).await.unwrap();
    let project_x = h.memory.remember_entity("ProjectX", "Project", now).await.unwrap();
    h.memory.relate(alice, project_x, "works_on", 0.9, now).await.unwrap();
    h.memory.relate(bob, project_x, "works_on", 0.7, now).await.unwrap();
    h.memory.observe(alice, "Alice prefers TypeScript", now).await.unwrap();
    h.memory.observe(bob, "Bob likes tea", now).await.unwrap();

    let options = SearchOptions {
        rerank: true,
        ..SearchOptions::new("Alice TypeScript project")
    };
    let results = h.memory.search(&options, now).await.unwrap();
    assert!(!results.is_empty());
    for r in &results {
        assert!((0.0..=1.0).contains(&r.score), "score {} out of bounds", r.score);
    }
}

#[tokio::test]
async fn p7_cache_round_trips_within_ttl_and_clears_on_demand() {
    let h = common::harness();
    let now = Utc::now();
    h.memory.remember_entity("Alice", "Person", now).await.unwrap();

    let options = SearchOptions::new("Alice");
    let first = h.memory.search(&options, now).await.unwrap();
    let second = h.memory.search(&options, now).await.unwrap();
    assert_eq!(
        first.iter().map(|r| r.entity_id()).collect::<Vec<_>>(),
        second.iter().map(|r| r.entity_id()).collect::<Vec<_>>(),
        "store(q); lookup(q) within TTL must return the same id order"
    );

    h.memory.clear_cache().await.unwrap();
    let after_clear = h.memory.search(&options, now).await.unwrap();
    assert_eq!(after_clear.len(), first.len());
}

#[tokio::test]
async fn p9_retraction_hides_at_now_but_not_at_an_earlier_timepoint() {
    let h = common::harness();
    let t_before = Utc::now();
    let alice = h.memory.remember_entity("Alice", "Person", t_before).await.unwrap();

    let t_retract = t_before + chrono::Duration::seconds(1);
    h.memory.retract_entity(alice, t_retract).await.unwrap();

    let entity = h.storage.get_entity(alice).await.unwrap().unwrap();
    let t_now = t_retract + chrono::Duration::seconds(1);
    assert!(!entity.is_asserted_at(t_now));
    assert!(entity.is_asserted_at(t_before));
}
