//! Summary of a closure run over the subsumption graph.

use std::fmt;

use amt_types::SctId;

/// What [`close_with`](crate::TerminologyGraph::close_with) found.
///
/// Counts describe the edge set the closure was built from. `cyclic` holds
/// every concept that reaches itself, sorted, and is empty for a valid
/// release.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClosureStats {
    /// Vertices in the graph.
    pub concept_count: usize,
    /// IS-A edges.
    pub edge_count: usize,
    /// Vertices without a parent.
    pub root_count: usize,
    /// Most BFS levels needed to close any one concept.
    pub max_depth: usize,
    /// Sum of all ancestor set sizes.
    pub ancestor_pairs: usize,
    /// Concepts that are their own ancestor.
    pub cyclic: Vec<SctId>,
    /// Whether the closure was computed on the rayon pool.
    pub parallel: bool,
    /// Wall time in milliseconds.
    pub build_time_ms: u64,
}

impl ClosureStats {
    /// Mean ancestor set size, zero for an empty graph.
    pub fn avg_ancestors(&self) -> f64 {
        if self.concept_count == 0 {
            0.0
        } else {
            self.ancestor_pairs as f64 / self.concept_count as f64
        }
    }

    /// Returns true if no concept is on a cycle.
    pub fn is_acyclic(&self) -> bool {
        self.cyclic.is_empty()
    }
}

impl fmt::Display for ClosureStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} concepts, {} IS-A edges, {} roots, depth {}, {:.1} ancestors per concept",
            self.concept_count,
            self.edge_count,
            self.root_count,
            self.max_depth,
            self.avg_ancestors()
        )?;
        if !self.is_acyclic() {
            write!(f, ", {} on cycles", self.cyclic.len())?;
        }
        write!(f, " in {}ms", self.build_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avg_ancestors() {
        assert_eq!(ClosureStats::default().avg_ancestors(), 0.0);

        let stats = ClosureStats {
            concept_count: 4,
            ancestor_pairs: 6,
            ..Default::default()
        };
        assert!((stats.avg_ancestors() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_display_mentions_cycles_only_when_present() {
        let mut stats = ClosureStats {
            concept_count: 6,
            edge_count: 5,
            root_count: 1,
            max_depth: 2,
            ancestor_pairs: 8,
            ..Default::default()
        };
        assert_eq!(
            stats.to_string(),
            "6 concepts, 5 IS-A edges, 1 roots, depth 2, 1.3 ancestors per concept in 0ms"
        );

        stats.cyclic = vec![200, 300];
        assert!(!stats.is_acyclic());
        assert!(stats.to_string().contains(", 2 on cycles in"));
    }
}
