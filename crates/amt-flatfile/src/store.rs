//! Release context: the concept arena, its subsumption graph and indexes.

use std::collections::{HashMap, HashSet};

use amt_graph::{ClosureStats, GraphResult, TerminologyGraph};
use amt_types::{Classification, LinkKind, SctId};
use tracing::{debug, warn};

use crate::classification::ClassificationIndex;
use crate::concept::Concept;
use crate::replacement::{Replacement, ReplacementIndex};

/// Everything loaded from one release.
///
/// The context is built once by ingestion, repaired by validation and then
/// only read. Concepts refer to each other by id; the graph holds the
/// subsumption edges and their closure.
#[derive(Debug, Clone, Default)]
pub struct ReleaseContext {
    concepts: HashMap<SctId, Concept>,
    graph: TerminologyGraph,
    classifications: ClassificationIndex,
    replacements: ReplacementIndex,
}

impl ReleaseContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty context sized for `concepts` concepts.
    pub fn with_capacity(concepts: usize) -> Self {
        Self {
            concepts: HashMap::with_capacity(concepts),
            graph: TerminologyGraph::with_capacity(concepts),
            ..Self::default()
        }
    }

    // Mutations used by ingestion and test fixtures.

    /// Adds a concept, or updates status and module of an existing one.
    ///
    /// Returns true if the concept is new.
    pub fn add_concept(&mut self, id: SctId, active: bool, module_id: SctId) -> bool {
        self.graph.add_vertex(id);
        match self.concepts.get_mut(&id) {
            Some(concept) => {
                concept.active = active;
                concept.module_id = module_id;
                false
            }
            None => {
                self.concepts.insert(id, Concept::new(id, active, module_id));
                true
            }
        }
    }

    /// Links `source` to `target`. Both concepts must exist.
    ///
    /// A [`LinkKind::Parent`] link also adds the graph edge. Returns true if
    /// the link was recorded.
    pub fn add_link(&mut self, source: SctId, kind: LinkKind, target: SctId) -> bool {
        if !self.concepts.contains_key(&target) {
            return false;
        }
        let Some(concept) = self.concepts.get_mut(&source) else {
            return false;
        };

        match kind {
            LinkKind::Parent => {
                concept.parents.insert(target);
                self.graph.add_edge(source, target);
            }
            LinkKind::Ingredient => {
                concept.ingredients.insert(target);
            }
            LinkKind::Unit => {
                concept.units.insert(target);
            }
            LinkKind::Subpack => {
                concept.subpacks.insert(target);
            }
            LinkKind::TradeProduct => {
                concept.tps.insert(target);
            }
        }
        true
    }

    /// Sets the fully specified name.
    pub fn set_fsn(&mut self, id: SctId, term: impl Into<String>) -> bool {
        self.concepts
            .get_mut(&id)
            .map(|c| c.fsn = term.into())
            .is_some()
    }

    /// Sets the preferred term.
    pub fn set_pt(&mut self, id: SctId, term: impl Into<String>) -> bool {
        self.concepts
            .get_mut(&id)
            .map(|c| c.pt = term.into())
            .is_some()
    }

    /// Adds an ARTG identifier to a concept.
    pub fn add_artg_id(&mut self, id: SctId, artg_id: impl Into<String>) -> bool {
        self.concepts
            .get_mut(&id)
            .map(|c| {
                c.artg_ids.insert(artg_id.into());
            })
            .is_some()
    }

    /// Tags a concept with a product-model classification.
    ///
    /// A concept tagged twice with different classifications keeps the last
    /// tag but stays a member of both sets.
    pub fn classify(&mut self, id: SctId, classification: Classification) -> bool {
        let Some(concept) = self.concepts.get_mut(&id) else {
            return false;
        };
        if let Some(previous) = concept.classification.filter(|c| *c != classification) {
            warn!(
                concept_id = id,
                %previous,
                %classification,
                "Concept is a member of two product-model refsets, keeping the last"
            );
        }
        concept.classification = Some(classification);
        self.classifications.insert(classification, id);
        true
    }

    /// Adds a replacement record.
    pub fn add_replacement(&mut self, replacement: Replacement) {
        self.replacements.push(replacement);
    }

    /// Computes the transitive closure of the subsumption graph.
    ///
    /// On a cycle the best-effort closure is kept and the error returned.
    pub fn close(&mut self, parallel: bool) -> GraphResult<ClosureStats> {
        self.graph.close_with(parallel)
    }

    pub(crate) fn concept_mut(&mut self, id: SctId) -> Option<&mut Concept> {
        self.concepts.get_mut(&id)
    }

    pub(crate) fn replacements_mut(&mut self) -> &mut ReplacementIndex {
        &mut self.replacements
    }

    pub(crate) fn classifications_mut(&mut self) -> &mut ClassificationIndex {
        &mut self.classifications
    }

    // Queries.

    /// Looks up a concept.
    #[inline]
    pub fn concept(&self, id: SctId) -> Option<&Concept> {
        self.concepts.get(&id)
    }

    /// Returns true if the concept was loaded.
    #[inline]
    pub fn contains(&self, id: SctId) -> bool {
        self.concepts.contains_key(&id)
    }

    /// Returns true if the concept was loaded and is active.
    pub fn is_active(&self, id: SctId) -> bool {
        self.concepts.get(&id).is_some_and(|c| c.active)
    }

    /// Iterates over all concepts in arbitrary order.
    pub fn concepts(&self) -> impl Iterator<Item = &Concept> + '_ {
        self.concepts.values()
    }

    /// Returns all concept ids in ascending order.
    pub fn sorted_ids(&self) -> Vec<SctId> {
        let mut ids: Vec<SctId> = self.concepts.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of concepts.
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// The subsumption graph.
    pub fn graph(&self) -> &TerminologyGraph {
        &self.graph
    }

    /// All ancestors of a concept; empty before closure.
    pub fn ancestors(&self, id: SctId) -> Option<&HashSet<SctId>> {
        self.graph.ancestors(id)
    }

    /// Returns true if `ancestor` is a proper ancestor of `descendant`.
    #[inline]
    pub fn is_ancestor_of(&self, ancestor: SctId, descendant: SctId) -> bool {
        self.graph.is_ancestor_of(ancestor, descendant)
    }

    /// The classification index.
    pub fn classifications(&self) -> &ClassificationIndex {
        &self.classifications
    }

    /// The replacement index.
    pub fn replacements(&self) -> &ReplacementIndex {
        &self.replacements
    }

    /// Report form of a concept, falling back to the bare id.
    pub fn summary(&self, id: SctId) -> String {
        match self.concepts.get(&id) {
            Some(concept) => concept.summary(),
            None => {
                debug!(concept_id = id, "Summary requested for unknown concept");
                id.to_string()
            }
        }
    }

    /// Preferred term of a concept, empty if unknown.
    pub fn pt(&self, id: SctId) -> &str {
        self.concepts.get(&id).map_or("", |c| c.pt.as_str())
    }
}
