//! # amt-graph
//!
//! Directed subsumption graph over concept identifiers with a precomputed
//! transitive closure.
//!
//! Only IS-A edges live in the graph; every other relationship kind is kept
//! as a link on the concept itself by the loader. After [`TerminologyGraph::close`]
//! ancestor membership tests are O(1).
//!
//! ## Quick Start
//!
//! ```rust
//! use amt_graph::TerminologyGraph;
//!
//! let mut graph = TerminologyGraph::new();
//! for id in [100, 200, 300] {
//!     graph.add_vertex(id);
//! }
//! graph.add_edge(200, 100);
//! graph.add_edge(300, 200);
//!
//! let stats = graph.close().unwrap();
//! assert_eq!(stats.concept_count, 3);
//! assert!(graph.is_ancestor_of(100, 300));
//! assert!(!graph.is_ancestor_of(300, 100));
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` - computes ancestor sets per vertex on the rayon pool. The
//!   result is identical to the sequential build.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod graph;
mod stats;

pub use error::{GraphError, GraphResult};
pub use graph::TerminologyGraph;
pub use stats::ClosureStats;

pub use amt_types::SctId;
