#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unused_self)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::assigning_clones)]
#![allow(clippy::borrowed_box)]
#![allow(clippy::float_cmp)]
#![allow(clippy::ref_option)]

//! # Memory Core
//!
//! Hybrid retrieval engine for a persistent associative memory service:
//! agents write *entities*, *observations*, and *relationships*, and
//! retrieve them through a retrieval core combining dense-vector similarity,
//! lexical matching, graph traversal, and learned reranking.
//!
//! ## Core Concepts
//!
//! - **Entities**: typed named nodes with bi-temporal validity.
//! - **Observations**: text attached to an entity, the primary
//!   lexical/semantic search target.
//! - **Relationships**: typed, weighted, directed edges between entities.
//! - **Hybrid search**: vector + lexical retrieval fused with RRF, time
//!   decay, and context boosting.
//! - **Graph-RAG**: vector-seeded BFS expansion along relationships.
//! - **Multi-hop pivots**: Retrieve-Reason-Prune-Aggregate traversal with
//!   confidence decay and helpfulness pruning.
//! - **Adaptive strategy selection**: epsilon-greedy choice among retrieval
//!   strategies, shaped by progressive-attenuation and cost-aware-F1
//!   rewards, with persisted per-strategy statistics.
//!
//! ## Module Organization
//!
//! ### Primary API
//! - [`engine`]: the top-level [`engine::AssociativeMemory`] façade that
//!   wires every component together.
//!
//! ### Retrieval algorithms
//! - [`search`]: hybrid vector/lexical search with RRF fusion.
//! - [`graph_rag`]: vector-seeded graph expansion.
//! - [`multihop`]: Retrieve-Reason-Prune-Aggregate pivot traversal.
//! - [`adaptive`]: query-complexity classification and strategy selection.
//! - [`logical_edges`]: implicit-edge derivation from entity metadata.
//! - [`temporal`]: time-aware embedding synthesis.
//!
//! ### Support modules
//! - [`types`]: the typed data model (`Entity`, `Observation`,
//!   `Relationship`, options, results).
//! - [`storage`]: the [`storage::StorageBackend`] trait and its in-memory
//!   reference implementation.
//! - [`embeddings`]: tokenizer/transformer provider, TTL LRU cache, and the
//!   serialising [`embeddings::EmbeddingService`].
//! - [`reranker`]: batched cross-encoder reranking.
//! - [`cache`]: the two-tier search-result cache.
//! - [`config`]: crate-wide configuration, loadable from TOML with
//!   environment overrides.
//! - [`constants`]: every named numeric constant, centralised.
//! - [`error`]: the crate's error taxonomy.
//! - [`math`]: shared vector-arithmetic helpers.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use memory_core::config::MemoryConfig;
//! use memory_core::embeddings::{EmbeddingService, MockEmbeddingProvider};
//! use memory_core::engine::AssociativeMemory;
//! use memory_core::reranker::{MockRerankerProvider, RerankerService};
//! use memory_core::storage::InMemoryStorage;
//! use memory_core::types::SearchOptions;
//!
//! # #[tokio::main]
//! # async fn main() -> memory_core::error::Result<()> {
//! let storage = Arc::new(InMemoryStorage::new());
//! let embeddings = EmbeddingService::new(Box::new(MockEmbeddingProvider::new(1024)));
//! let reranker = RerankerService::new(Box::new(MockRerankerProvider::new()));
//! let memory = AssociativeMemory::new(storage, embeddings, reranker, MemoryConfig::default());
//!
//! let now = Utc::now();
//! let alice = memory.remember_entity("Alice", "Person", now).await?;
//! memory.observe(alice, "Alice prefers TypeScript", now).await?;
//!
//! let results = memory.search(&SearchOptions::new("Alice"), now).await?;
//! println!("found {} result(s)", results.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible public operation returns [`error::Result<T>`]; see
//! [`error::Error`] for the abstract error kinds (`not-found`,
//! `validation`, `storage`, `embedding`, `reranker`, `timeout`, `internal`)
//! a tool-call façade built on top of this crate would surface.
//!
//! ## Feature Flags
//!
//! - `reranker-remote`: enable a remote HTTP-backed cross-encoder reranker.
//! - `proptest-arbitrary`: derive `proptest::Arbitrary` on the id/validity
//!   newtypes, for the property-test suite.

pub mod adaptive;
pub mod cache;
pub mod config;
pub mod constants;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod graph_rag;
pub mod logical_edges;
pub mod math;
pub mod multihop;
pub mod reranker;
pub mod search;
pub mod storage;
pub mod temporal;
pub mod types;

// Re-export the most commonly used entry points.
pub use engine::AssociativeMemory;
pub use error::{Error, Result};
