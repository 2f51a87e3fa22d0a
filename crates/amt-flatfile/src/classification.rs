//! Product-model classification index.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use amt_types::{Classification, SctId};

static EMPTY: BTreeSet<SctId> = BTreeSet::new();

/// Content-model generation of the release.
///
/// Legacy releases ship one refset file per product-model kind; current
/// releases ship them all in a single simple refset file. The generation
/// decides how the resolver finds a unit's trade product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContentModel {
    /// Several product-model refset files.
    Legacy,
    /// A single product-model refset file.
    #[default]
    Current,
}

impl ContentModel {
    /// Derives the generation from the number of product-model refset files read.
    pub fn from_refset_file_count(count: usize) -> Self {
        if count > 1 {
            ContentModel::Legacy
        } else {
            ContentModel::Current
        }
    }

    /// Returns true for the legacy generation.
    pub fn is_legacy(self) -> bool {
        self == ContentModel::Legacy
    }
}

impl fmt::Display for ContentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentModel::Legacy => write!(f, "legacy"),
            ContentModel::Current => write!(f, "current"),
        }
    }
}

/// Membership of the seven product-model reference sets.
#[derive(Debug, Clone, Default)]
pub struct ClassificationIndex {
    members: BTreeMap<Classification, BTreeSet<SctId>>,
    content_model: ContentModel,
}

impl ClassificationIndex {
    /// Creates an empty index for the current generation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member. Returns false if it was already present.
    pub fn insert(&mut self, classification: Classification, concept_id: SctId) -> bool {
        self.members
            .entry(classification)
            .or_default()
            .insert(concept_id)
    }

    /// Removes a member. Returns true if it was present.
    pub fn remove(&mut self, classification: Classification, concept_id: SctId) -> bool {
        self.members
            .get_mut(&classification)
            .is_some_and(|set| set.remove(&concept_id))
    }

    /// Returns the members of a classification in id order.
    pub fn members(&self, classification: Classification) -> &BTreeSet<SctId> {
        self.members.get(&classification).unwrap_or(&EMPTY)
    }

    /// Returns true if the concept is a member of the classification.
    #[inline]
    pub fn contains(&self, classification: Classification, concept_id: SctId) -> bool {
        self.members(classification).contains(&concept_id)
    }

    /// Number of members of a classification.
    pub fn len(&self, classification: Classification) -> usize {
        self.members(classification).len()
    }

    /// Returns true if no classification has members.
    pub fn is_empty(&self) -> bool {
        self.members.values().all(BTreeSet::is_empty)
    }

    /// Content-model generation.
    pub fn content_model(&self) -> ContentModel {
        self.content_model
    }

    /// Sets the content-model generation.
    pub fn set_content_model(&mut self, content_model: ContentModel) {
        self.content_model = content_model;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut index = ClassificationIndex::new();
        assert!(index.insert(Classification::Ctpp, 10));
        assert!(!index.insert(Classification::Ctpp, 10));
        assert_eq!(index.len(Classification::Ctpp), 1);
        assert!(index.contains(Classification::Ctpp, 10));
        assert!(!index.contains(Classification::Tpp, 10));
    }

    #[test]
    fn test_remove() {
        let mut index = ClassificationIndex::new();
        index.insert(Classification::Ctpp, 10);
        assert!(index.remove(Classification::Ctpp, 10));
        assert!(!index.remove(Classification::Ctpp, 10));
        assert!(!index.remove(Classification::Mp, 10));
        assert!(index.is_empty());
    }

    #[test]
    fn test_members_of_unknown_classification_is_empty() {
        let index = ClassificationIndex::new();
        assert!(index.members(Classification::Mpuu).is_empty());
    }

    #[test]
    fn test_content_model_from_file_count() {
        assert_eq!(ContentModel::from_refset_file_count(1), ContentModel::Current);
        assert_eq!(ContentModel::from_refset_file_count(7), ContentModel::Legacy);
        assert!(ContentModel::Legacy.is_legacy());
        assert_eq!(ContentModel::default().to_string(), "current");
    }
}
