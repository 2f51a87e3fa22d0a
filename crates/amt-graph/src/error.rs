//! Error types for graph closure.

use amt_types::SctId;
use thiserror::Error;

/// Errors that can occur while closing the graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Some concepts are their own ancestors. The closure is still built,
    /// with each concept left out of its own ancestor set.
    #[error("could not close graph, {} concept(s) are part of a subsumption cycle", concepts.len())]
    Cycle {
        /// Concepts that reach themselves, in ascending order.
        concepts: Vec<SctId>,
    },
}

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;
