//! Concepts held by the release store.

use std::collections::BTreeSet;
use std::fmt;

use amt_types::{Classification, SctId};

/// One terminology concept with its product-model links.
///
/// Links are concept ids into the owning
/// [`ReleaseContext`](crate::store::ReleaseContext), never references, and
/// ancestors live in the context's closed graph.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Concept {
    /// Concept identifier.
    pub id: SctId,
    /// Status in the snapshot.
    pub active: bool,
    /// Module the concept row came from.
    pub module_id: SctId,
    /// Fully specified name; empty until a description sets it.
    pub fsn: String,
    /// Preferred term; empty until a description sets it.
    pub pt: String,
    /// Product-model classification, if any.
    pub classification: Option<Classification>,
    /// Direct IS-A parents.
    pub parents: BTreeSet<SctId>,
    /// Units of use, clinical drugs and devices.
    pub units: BTreeSet<SctId>,
    /// Nested packs.
    pub subpacks: BTreeSet<SctId>,
    /// Trade product names.
    pub tps: BTreeSet<SctId>,
    /// Active ingredients.
    pub ingredients: BTreeSet<SctId>,
    /// ARTG registration identifiers.
    pub artg_ids: BTreeSet<String>,
}

impl Concept {
    /// Creates a concept with no names or links.
    pub fn new(id: SctId, active: bool, module_id: SctId) -> Self {
        Self {
            id,
            active,
            module_id,
            fsn: String::new(),
            pt: String::new(),
            classification: None,
            parents: BTreeSet::new(),
            units: BTreeSet::new(),
            subpacks: BTreeSet::new(),
            tps: BTreeSet::new(),
            ingredients: BTreeSet::new(),
            artg_ids: BTreeSet::new(),
        }
    }

    /// Short `id |preferred term|` form used in reports.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} |{}|", self.id, self.pt)
    }
}

/// Joins concept summaries for a report detail.
pub(crate) fn summaries<'a>(concepts: impl IntoIterator<Item = &'a Concept>) -> String {
    concepts
        .into_iter()
        .map(Concept::summary)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_concept_is_empty() {
        let concept = Concept::new(100, true, 1);
        assert!(concept.fsn.is_empty());
        assert!(concept.parents.is_empty());
        assert!(concept.classification.is_none());
    }

    #[test]
    fn test_summary() {
        let mut concept = Concept::new(100, true, 1);
        concept.pt = "Paracetamol 500 mg tablet".to_string();
        assert_eq!(concept.summary(), "100 |Paracetamol 500 mg tablet|");
    }

    #[test]
    fn test_summaries() {
        let a = Concept::new(1, true, 1);
        let mut b = Concept::new(2, true, 1);
        b.pt = "b".to_string();
        assert_eq!(summaries([&a, &b]), "1 ||, 2 |b|");
    }
}
