//! Relationship types the AMT loader understands.

use crate::well_known;
use crate::SctId;

/// A recognised relationship (attribute) type.
///
/// Only subsumption becomes a graph edge; every other kind is recorded as a
/// link on the source concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeType {
    /// Subsumption.
    IsA,
    /// Has intended active ingredient.
    HasIntendedActiveIngredient,
    /// Has active ingredient.
    HasActiveIngredient,
    /// Has precise active ingredient.
    HasPreciseActiveIngredient,
    /// Has MPUU.
    HasMpuu,
    /// Has TPUU.
    HasTpuu,
    /// Contains clinical drug.
    ContainsClinicalDrug,
    /// Contains device.
    ContainsDevice,
    /// Contains packaged clinical drug.
    ContainsPackagedClinicalDrug,
    /// Has TP.
    HasTp,
    /// Has product name.
    HasProductName,
}

/// Which concept link a relationship type populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Direct parent (and graph edge).
    Parent,
    /// Active ingredient.
    Ingredient,
    /// Unit of use or device.
    Unit,
    /// Nested pack.
    Subpack,
    /// Trade product name.
    TradeProduct,
}

impl AttributeType {
    /// Looks up a relationship type by its concept id.
    pub fn from_id(type_id: SctId) -> Option<Self> {
        let kind = match type_id {
            well_known::IS_A => AttributeType::IsA,
            well_known::HAS_INTENDED_ACTIVE_INGREDIENT => AttributeType::HasIntendedActiveIngredient,
            well_known::HAS_ACTIVE_INGREDIENT => AttributeType::HasActiveIngredient,
            well_known::HAS_PRECISE_ACTIVE_INGREDIENT => AttributeType::HasPreciseActiveIngredient,
            well_known::HAS_MPUU => AttributeType::HasMpuu,
            well_known::HAS_TPUU => AttributeType::HasTpuu,
            well_known::CONTAINS_CLINICAL_DRUG => AttributeType::ContainsClinicalDrug,
            well_known::CONTAINS_DEVICE => AttributeType::ContainsDevice,
            well_known::CONTAINS_PACKAGED_CLINICAL_DRUG => {
                AttributeType::ContainsPackagedClinicalDrug
            }
            well_known::HAS_TP => AttributeType::HasTp,
            well_known::HAS_PRODUCT_NAME => AttributeType::HasProductName,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns the concept id of this relationship type.
    pub fn id(self) -> SctId {
        match self {
            AttributeType::IsA => well_known::IS_A,
            AttributeType::HasIntendedActiveIngredient => well_known::HAS_INTENDED_ACTIVE_INGREDIENT,
            AttributeType::HasActiveIngredient => well_known::HAS_ACTIVE_INGREDIENT,
            AttributeType::HasPreciseActiveIngredient => well_known::HAS_PRECISE_ACTIVE_INGREDIENT,
            AttributeType::HasMpuu => well_known::HAS_MPUU,
            AttributeType::HasTpuu => well_known::HAS_TPUU,
            AttributeType::ContainsClinicalDrug => well_known::CONTAINS_CLINICAL_DRUG,
            AttributeType::ContainsDevice => well_known::CONTAINS_DEVICE,
            AttributeType::ContainsPackagedClinicalDrug => {
                well_known::CONTAINS_PACKAGED_CLINICAL_DRUG
            }
            AttributeType::HasTp => well_known::HAS_TP,
            AttributeType::HasProductName => well_known::HAS_PRODUCT_NAME,
        }
    }

    /// Returns the concept link this relationship type feeds.
    pub fn link_kind(self) -> LinkKind {
        match self {
            AttributeType::IsA => LinkKind::Parent,
            AttributeType::HasIntendedActiveIngredient
            | AttributeType::HasActiveIngredient
            | AttributeType::HasPreciseActiveIngredient => LinkKind::Ingredient,
            AttributeType::HasMpuu
            | AttributeType::HasTpuu
            | AttributeType::ContainsClinicalDrug
            | AttributeType::ContainsDevice => LinkKind::Unit,
            AttributeType::ContainsPackagedClinicalDrug => LinkKind::Subpack,
            AttributeType::HasTp | AttributeType::HasProductName => LinkKind::TradeProduct,
        }
    }
}
