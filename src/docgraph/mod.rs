//! Graph assembly and the published graph.
//!
//! # Module Organization
//!
//! - [`base`]: [DocumentGraph] and [build_graph], the id, type and search indexes
//! - [`graph`]: [RelationGraph], the typed relation table
//! - [`search`]: token index used by `search_nodes`
//! - [`store`]: [GraphStore], the single-slot published graph
//!
//! ```rust
//! use lamad_core::{
//!     codec::{DocumentCompiler, MemorySource},
//!     docgraph::GraphStore,
//!     query::GraphQuery,
//! };
//!
//! let mut source = MemorySource::new();
//! source.insert(
//!     "auth/login.feature",
//!     "Feature: Login\n  Scenario: Ok\n    Given a user\n",
//! );
//! let store = GraphStore::new();
//! assert!(store.search_nodes("login").is_empty());
//! store.rebuild_from(&DocumentCompiler::new(), &source).unwrap();
//! assert_eq!(store.search_nodes("login").len(), 1);
//! ```

mod base;
mod graph;
pub mod search;
mod store;

#[cfg(test)]
mod tests;

pub use base::{build_from_source, build_graph, DocumentGraph, GraphMetadata};
pub use graph::RelationGraph;
pub use search::{tokenize, SearchIndex};
pub use store::GraphStore;
