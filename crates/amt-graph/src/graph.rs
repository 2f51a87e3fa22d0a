//! Subsumption graph with precomputed transitive closure.
//!
//! # Example
//!
//! ```ignore
//! use amt_graph::TerminologyGraph;
//!
//! // Load vertices and IS-A edges (one-time operation)
//! let mut graph = TerminologyGraph::with_capacity(concepts.len());
//! for id in concepts {
//!     graph.add_vertex(id);
//! }
//! for (child, parent) in is_a_edges {
//!     graph.add_edge(child, parent);
//! }
//!
//! // Close once, then answer ancestor queries in O(1)
//! graph.close()?;
//! if graph.is_ancestor_of(well_known::MPUU, tpuu) {
//!     println!("TPUU sits below the MPUU model concept");
//! }
//! ```

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Instant;

use amt_types::SctId;
use tracing::{debug, info, warn};

use crate::error::{GraphError, GraphResult};
use crate::stats::ClosureStats;

/// Closure result for a single vertex.
struct AncestorSet {
    concept_id: SctId,
    ancestors: HashSet<SctId>,
    depth: usize,
    cyclic: bool,
}

/// Directed graph holding one edge per direct subsumption relationship.
///
/// Edges point from child to parent. Edges are only accepted between
/// vertices that already exist, so concepts must be added before the
/// relationships that reference them.
///
/// Ancestor queries answer from the closure built by [`close`](Self::close);
/// before that they see nothing. A concept is never its own ancestor, even
/// when malformed input puts it on a cycle.
#[derive(Debug, Clone, Default)]
pub struct TerminologyGraph {
    /// All known concept IDs.
    vertices: HashSet<SctId>,
    /// Direct parents for each concept.
    parents: HashMap<SctId, BTreeSet<SctId>>,
    /// Direct children for each concept.
    children: HashMap<SctId, BTreeSet<SctId>>,
    /// Number of distinct edges.
    edge_count: usize,
    /// For each concept, the set of all ancestors (transitive IS-A closure).
    ancestors: HashMap<SctId, HashSet<SctId>>,
    /// Statistics of the last closure, `None` while the graph is open.
    stats: Option<ClosureStats>,
}

impl TerminologyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty graph sized for `concepts` vertices.
    pub fn with_capacity(concepts: usize) -> Self {
        Self {
            vertices: HashSet::with_capacity(concepts),
            ..Self::default()
        }
    }

    /// Adds a vertex. Returns false if it was already present.
    pub fn add_vertex(&mut self, concept_id: SctId) -> bool {
        self.vertices.insert(concept_id)
    }

    /// Returns true if the vertex exists.
    #[inline]
    pub fn contains_vertex(&self, concept_id: SctId) -> bool {
        self.vertices.contains(&concept_id)
    }

    /// Adds a `child IS-A parent` edge.
    ///
    /// The edge is inserted only if both endpoints exist and differ. Returns
    /// true if a new edge was inserted. Adding an edge to a closed graph
    /// discards the closure.
    pub fn add_edge(&mut self, child: SctId, parent: SctId) -> bool {
        if child == parent || !self.contains_vertex(child) || !self.contains_vertex(parent) {
            return false;
        }

        let inserted = self.parents.entry(child).or_default().insert(parent);
        if inserted {
            self.children.entry(parent).or_default().insert(child);
            self.edge_count += 1;
            if self.stats.take().is_some() {
                self.ancestors.clear();
            }
        }
        inserted
    }

    /// Computes the transitive closure sequentially.
    ///
    /// See [`close_with`](Self::close_with).
    pub fn close(&mut self) -> GraphResult<ClosureStats> {
        self.close_with(false)
    }

    /// Computes the transitive closure, optionally per vertex in parallel.
    ///
    /// The closure is a pure function of the edge set, so closing again is a
    /// no-op apart from timing. `parallel` only has an effect with the
    /// `parallel` feature.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Cycle`] if any concept reaches itself. The
    /// best-effort closure is kept in that case and every query keeps
    /// working.
    pub fn close_with(&mut self, parallel: bool) -> GraphResult<ClosureStats> {
        let start = Instant::now();
        info!(
            concepts = self.vertices.len(),
            edges = self.edge_count,
            parallel,
            "Calculating transitive closure"
        );

        let concept_count = self.vertices.len();
        let mut ancestors: HashMap<SctId, HashSet<SctId>> = HashMap::with_capacity(concept_count);
        let mut max_depth = 0;
        let mut total_ancestors = 0usize;
        let mut cyclic = Vec::new();

        for set in self.compute_ancestor_sets(parallel) {
            max_depth = max_depth.max(set.depth);
            total_ancestors += set.ancestors.len();
            if set.cyclic {
                cyclic.push(set.concept_id);
            }
            if !set.ancestors.is_empty() {
                ancestors.insert(set.concept_id, set.ancestors);
            }
        }
        cyclic.sort_unstable();
        let root_count = self
            .vertices
            .iter()
            .filter(|&id| self.parents.get(id).map_or(true, BTreeSet::is_empty))
            .count();

        let stats = ClosureStats {
            concept_count,
            edge_count: self.edge_count,
            root_count,
            max_depth,
            ancestor_pairs: total_ancestors,
            cyclic,
            parallel: parallel && cfg!(feature = "parallel"),
            build_time_ms: start.elapsed().as_millis() as u64,
        };

        self.ancestors = ancestors;
        self.stats = Some(stats.clone());
        info!(
            build_time_ms = stats.build_time_ms,
            max_depth = stats.max_depth,
            "Calculated transitive closure"
        );
        debug!("{stats}");

        if stats.is_acyclic() {
            Ok(stats)
        } else {
            warn!(count = stats.cyclic.len(), "Subsumption cycle detected while closing graph");
            Err(GraphError::Cycle {
                concepts: stats.cyclic,
            })
        }
    }

    #[cfg(feature = "parallel")]
    fn compute_ancestor_sets(&self, parallel: bool) -> Vec<AncestorSet> {
        use rayon::prelude::*;

        if parallel {
            self.vertices
                .par_iter()
                .map(|&concept_id| Self::compute_ancestors(concept_id, &self.parents))
                .collect()
        } else {
            self.compute_ancestor_sets_sequential()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn compute_ancestor_sets(&self, _parallel: bool) -> Vec<AncestorSet> {
        self.compute_ancestor_sets_sequential()
    }

    fn compute_ancestor_sets_sequential(&self) -> Vec<AncestorSet> {
        self.vertices
            .iter()
            .map(|&concept_id| Self::compute_ancestors(concept_id, &self.parents))
            .collect()
    }

    /// Computes all ancestors of a concept, one BFS level at a time.
    fn compute_ancestors(
        concept_id: SctId,
        parents: &HashMap<SctId, BTreeSet<SctId>>,
    ) -> AncestorSet {
        let mut result = HashSet::new();
        let mut frontier = vec![concept_id];
        let mut depth = 0;
        let mut cyclic = false;

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for current in frontier {
                let Some(current_parents) = parents.get(&current) else {
                    continue;
                };
                for &parent_id in current_parents {
                    if parent_id == concept_id {
                        cyclic = true;
                    } else if result.insert(parent_id) {
                        next.push(parent_id);
                    }
                }
            }
            if !next.is_empty() {
                depth += 1;
            }
            frontier = next;
        }

        AncestorSet {
            concept_id,
            ancestors: result,
            depth,
            cyclic,
        }
    }

    /// Returns true once [`close`](Self::close) has run on the current edges.
    pub fn is_closed(&self) -> bool {
        self.stats.is_some()
    }

    /// Returns true if `ancestor` is an ancestor of `descendant` (O(1)).
    #[inline]
    pub fn is_ancestor_of(&self, ancestor: SctId, descendant: SctId) -> bool {
        self.ancestors
            .get(&descendant)
            .is_some_and(|anc| anc.contains(&ancestor))
    }

    /// Gets all ancestors of a concept.
    ///
    /// Returns `None` if the concept has no ancestors or the graph is not
    /// closed.
    #[inline]
    pub fn ancestors(&self, concept_id: SctId) -> Option<&HashSet<SctId>> {
        self.ancestors.get(&concept_id)
    }

    /// Gets all descendants of a concept using BFS over direct children.
    pub fn descendants(&self, concept_id: SctId) -> HashSet<SctId> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<SctId> = self.direct_children(concept_id).collect();

        while let Some(current) = queue.pop_front() {
            if current == concept_id || !visited.insert(current) {
                continue;
            }
            queue.extend(self.direct_children(current));
        }

        visited
    }

    /// Gets direct parents of a concept.
    pub fn direct_parents(&self, concept_id: SctId) -> impl Iterator<Item = SctId> + '_ {
        self.parents.get(&concept_id).into_iter().flatten().copied()
    }

    /// Gets direct children of a concept.
    pub fn direct_children(&self, concept_id: SctId) -> impl Iterator<Item = SctId> + '_ {
        self.children.get(&concept_id).into_iter().flatten().copied()
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn concept_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Returns an iterator over all concept IDs.
    pub fn all_concepts(&self) -> impl Iterator<Item = SctId> + '_ {
        self.vertices.iter().copied()
    }

    /// Returns statistics of the last closure.
    pub fn stats(&self) -> Option<&ClosureStats> {
        self.stats.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a test hierarchy:
    /// ```text
    /// 100 (root)
    ///  |-- 200
    ///  |    |-- 400
    ///  |    |-- 500
    ///  |-- 300
    ///       |-- 600
    /// ```
    fn create_test_graph() -> TerminologyGraph {
        let mut graph = TerminologyGraph::new();

        for id in [100, 200, 300, 400, 500, 600] {
            graph.add_vertex(id);
        }

        graph.add_edge(200, 100);
        graph.add_edge(300, 100);
        graph.add_edge(400, 200);
        graph.add_edge(500, 200);
        graph.add_edge(600, 300);

        graph
    }

    #[test]
    fn test_close() {
        let mut graph = create_test_graph();
        let stats = graph.close().unwrap();

        assert_eq!(stats.concept_count, 6);
        assert_eq!(stats.edge_count, 5);
        assert_eq!(stats.root_count, 1);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.ancestor_pairs, 8);
        assert!(stats.is_acyclic());
        assert!(graph.is_closed());
    }

    #[test]
    fn test_add_edge_requires_both_endpoints() {
        let mut graph = create_test_graph();

        assert!(!graph.add_edge(700, 100));
        assert!(!graph.add_edge(100, 700));
        assert!(!graph.add_edge(100, 100));
        assert!(!graph.add_edge(200, 100), "duplicate edge");
        assert_eq!(graph.edge_count(), 5);
    }

    #[test]
    fn test_is_ancestor_of() {
        let mut graph = create_test_graph();
        graph.close().unwrap();

        assert!(graph.is_ancestor_of(100, 200));
        assert!(graph.is_ancestor_of(100, 400));
        assert!(graph.is_ancestor_of(100, 600));
        assert!(graph.is_ancestor_of(200, 500));
        assert!(!graph.is_ancestor_of(200, 600));
        assert!(!graph.is_ancestor_of(400, 100));
        assert!(!graph.is_ancestor_of(400, 400));
    }

    #[test]
    fn test_ancestors() {
        let mut graph = create_test_graph();
        graph.close().unwrap();

        let ancestors = graph.ancestors(400).unwrap();
        assert_eq!(ancestors.len(), 2);
        assert!(ancestors.contains(&200));
        assert!(ancestors.contains(&100));

        assert!(graph.ancestors(100).is_none());
    }

    #[test]
    fn test_no_ancestors_before_close() {
        let graph = create_test_graph();
        assert!(graph.ancestors(400).is_none());
        assert!(!graph.is_closed());
    }

    #[test]
    fn test_descendants() {
        let graph = create_test_graph();

        let descendants = graph.descendants(100);
        assert_eq!(descendants.len(), 5);

        let descendants = graph.descendants(200);
        assert_eq!(descendants, HashSet::from([400, 500]));

        assert!(graph.descendants(400).is_empty());
    }

    #[test]
    fn test_direct_parents_children() {
        let graph = create_test_graph();

        let parents: Vec<SctId> = graph.direct_parents(400).collect();
        assert_eq!(parents, vec![200]);

        let children: Vec<SctId> = graph.direct_children(100).collect();
        assert_eq!(children, vec![200, 300]);
    }

    #[test]
    fn test_diamond_inheritance() {
        // Diamond pattern:
        //     100
        //    /   \
        //  200   300
        //    \   /
        //     400
        let mut graph = TerminologyGraph::new();
        for id in [100, 200, 300, 400] {
            graph.add_vertex(id);
        }
        graph.add_edge(200, 100);
        graph.add_edge(300, 100);
        graph.add_edge(400, 200);
        graph.add_edge(400, 300);

        graph.close().unwrap();

        let ancestors = graph.ancestors(400).unwrap();
        assert_eq!(ancestors.len(), 3);
        assert_eq!(graph.descendants(100).len(), 3);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut graph = create_test_graph();
        graph.close().unwrap();
        let first: HashMap<SctId, HashSet<SctId>> = graph.ancestors.clone();

        graph.close().unwrap();
        assert_eq!(graph.ancestors, first);
    }

    #[test]
    fn test_add_edge_reopens_graph() {
        let mut graph = create_test_graph();
        graph.close().unwrap();

        assert!(graph.add_edge(600, 200));
        assert!(!graph.is_closed());
        assert!(graph.ancestors(600).is_none());

        graph.close().unwrap();
        assert!(graph.is_ancestor_of(200, 600));
    }

    #[test]
    fn test_cycle_is_reported_with_best_effort_closure() {
        //  100 <- 200 <- 300 <- 200 (cycle between 200 and 300)
        let mut graph = TerminologyGraph::new();
        for id in [100, 200, 300, 400] {
            graph.add_vertex(id);
        }
        graph.add_edge(200, 100);
        graph.add_edge(300, 200);
        graph.add_edge(200, 300);
        graph.add_edge(400, 300);

        let err = graph.close().unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle {
                concepts: vec![200, 300]
            }
        );

        assert!(graph.is_closed());
        assert_eq!(graph.ancestors(400).unwrap(), &HashSet::from([100, 200, 300]));
        assert!(!graph.is_ancestor_of(200, 200));
        assert!(graph.is_ancestor_of(300, 200));
        assert_eq!(graph.stats().unwrap().cyclic, vec![200, 300]);
    }

    #[test]
    fn test_disconnected_graph() {
        let mut graph = TerminologyGraph::new();
        for id in [1, 2, 3, 4] {
            graph.add_vertex(id);
        }
        graph.add_edge(2, 1);
        graph.add_edge(4, 3);

        graph.close().unwrap();
        assert!(graph.is_ancestor_of(1, 2));
        assert!(!graph.is_ancestor_of(1, 4));
        assert!(graph.ancestors(3).is_none());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let mut sequential = create_test_graph();
        sequential.close().unwrap();

        let mut parallel = create_test_graph();
        parallel.close_with(true).unwrap();

        assert_eq!(sequential.ancestors, parallel.ancestors);
    }
}
