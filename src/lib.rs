//! # lamad-core
//!
//! Compiles a directory of Markdown epics and Gherkin `.feature` files into a typed, queryable
//! documentation graph.
//!
//! ## Overview
//!
//! Product documentation is kept as two kinds of source file:
//!
//! - **Epics**: Markdown documents (an `epic.md` or any Markdown file whose front matter declares
//!   `type: epic`) describing a product area, split into ordered sections.
//! - **Features**: Gherkin files, each holding a feature and its scenarios, tagged with the epics
//!   they belong to (`@epic:auth`).
//!
//! lamad-core parses both into [`properties::DocumentNode`]s with deterministic ids, links them
//! through a typed relation table and serves the result through [`query::GraphQuery`]. Selected
//! features can be written back out as plain `.feature` files for a BDD runner.
//!
//! ## Architecture
//!
//! - **[`codec`]**: per-format parsers (`DocCodec`) and the [`codec::DocumentCompiler`] that
//!   drives a batch of source artifacts through them
//! - **[`docgraph`]**: graph assembly, relation table, search index and the single-slot
//!   [`docgraph::GraphStore`]
//! - **[`query`]**: the read-only query surface
//! - **[`selection`]**: rules deciding which content counts as a feature and where it is filed
//! - **[`export`]**: writing selected features and a manifest to an output directory
//! - **[`properties`]**: node, step, table and relation types
//! - **[`ids`]**: deterministic node ids and collision suffixes
//! - **[`paths`]**: slugs, anchors and source-path helpers
//! - **[`config`]**: `lamad.toml` configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lamad_core::{
//!     codec::{DirectorySource, DocumentCompiler},
//!     docgraph::GraphStore,
//!     properties::NodeType,
//!     query::GraphQuery,
//! };
//!
//! fn main() -> Result<(), lamad_core::LamadError> {
//!     let store = GraphStore::new();
//!     let graph = store.rebuild_from(&DocumentCompiler::new(), &DirectorySource::new("./docs"))?;
//!
//!     for feature in store.get_nodes_by_type(NodeType::Feature) {
//!         println!("{feature}");
//!     }
//!     for failure in graph.parse_results().iter().filter(|r| r.is_failure()) {
//!         eprintln!("{:?}: {:?}", failure.artifact.path, failure.error);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Diagnostics
//!
//! A file that cannot be parsed does not stop the build; its [`codec::ParseResult`] carries the
//! error and the other files still contribute nodes. Non-fatal problems are reported as
//! [`codec::ParseDiagnostic`]s:
//!
//! ```rust
//! use lamad_core::codec::{parse_feature_with, ParseOptions, ParseDiagnostic};
//! use lamad_core::ids::IdAllocator;
//!
//! let parsed = parse_feature_with(
//!     "Feature: Login\n  Scenario: Ok\n    Given a user\n    stray line\n",
//!     "auth/login.feature",
//!     "auth",
//!     &mut IdAllocator::new(),
//!     ParseOptions::strict(),
//! )
//! .unwrap();
//! assert!(matches!(
//!     parsed.diagnostics.as_slice(),
//!     [ParseDiagnostic::SkippedLine { line: 4, .. }]
//! ));
//! ```
//!
//! ## Node Ids
//!
//! Ids are derived from the node type, the last two path segments of the source file and, for
//! scenarios, the scenario title: `auth/login.feature` yields `feature_auth_login`, and its
//! "Valid credentials" scenario `scenario_auth_login_valid_credentials`. A collision within one
//! build gets a positional suffix (`_2`, `_3`, ...). Epics may set an explicit `id` in their
//! front matter.

pub mod codec;
pub mod config;
pub mod docgraph;
pub mod error;
pub mod export;
pub mod ids;
pub mod paths;
pub mod properties;
pub mod query;
pub mod selection;

pub use error::*;
