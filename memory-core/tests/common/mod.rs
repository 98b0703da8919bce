//! Shared harness for the scenario/property integration tests: a
//! fully-wired in-memory engine plus a direct storage handle for
//! assertions and writes the façade surface doesn't expose (e.g. an
//! observation with an explicit `task_id`).

use std::sync::Arc;

use memory_core::config::MemoryConfig;
use memory_core::embeddings::{EmbeddingService, MockEmbeddingProvider};
use memory_core::engine::AssociativeMemory;
use memory_core::reranker::{MockRerankerProvider, RerankerService};
use memory_core::storage::{InMemoryStorage, StorageBackend};

#[allow(dead_code)]
pub struct Harness {
    pub memory: AssociativeMemory,
    pub storage: Arc<InMemoryStorage>,
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with_dimension(32)
}

#[allow(dead_code)]
pub fn harness_with_dimension(dimension: usize) -> Harness {
    let storage = Arc::new(InMemoryStorage::new());
    let embeddings = EmbeddingService::new(Box::new(MockEmbeddingProvider::new(dimension)));
    let reranker = RerankerService::new(Box::new(MockRerankerProvider::new()));
    let mut config = MemoryConfig::default();
    config.embedding_dimension = dimension;
    let engine_storage: Arc<dyn StorageBackend> = storage.clone();
    let memory = AssociativeMemory::new(engine_storage, embeddings, reranker, config);
    Harness { memory, storage }
}
