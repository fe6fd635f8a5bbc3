//! Code graph module: entities, references and the relations between them.
//!
//! Provides the data model, the store boundary the indexer writes through,
//! the in-memory petgraph store, and project-wide graph building.

pub mod builder;
pub mod engine;
pub mod store;
pub mod types;

pub use builder::{build_graph, collect_files, BuildReport};
pub use engine::{Graph, GraphStats};
pub use store::{Insert, SharedGraph};
pub use types::{
    Entity, EntityType, Id, Node, Properties, Reference, Relation, RelationSite, RelationType,
};
