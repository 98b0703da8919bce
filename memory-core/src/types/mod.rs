//! Core data-model types: the typed structs everything below the façade
//! boundary operates on (§9 "Runtime-dynamic option maps ... translated to
//! explicit, enumerated config records on entry").

mod entity;
mod observation;
mod options;
mod relationship;
mod result;
mod strategy;
mod validity;

pub use entity::Entity;
pub use observation::Observation;
pub use options::{AdaptiveOptions, GraphConstraints, MultiHopOptions, SearchOptions, VectorParams};
pub use relationship::Relationship;
pub use result::{Explanation, MatchedItem, SearchResult};
pub use strategy::{QueryComplexity, StrategyName, StrategyPerformance};
pub use validity::Validity;
