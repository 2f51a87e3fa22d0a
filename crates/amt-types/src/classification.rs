//! The seven AMT product model classifications.

use std::fmt;

use crate::well_known;
use crate::SctId;

/// A product model classification, assigned to a concept by membership of
/// the matching reference set.
///
/// # Examples
///
/// ```
/// use amt_types::{well_known, Classification};
///
/// let tag = Classification::from_refset_id(well_known::MPUU_REFSET).unwrap();
/// assert_eq!(tag, Classification::Mpuu);
/// assert_eq!(tag.anchor_id(), well_known::MPUU);
/// assert_eq!(tag.to_string(), "MPUU");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Classification {
    /// Containered trade product pack.
    Ctpp,
    /// Trade product pack.
    Tpp,
    /// Trade product unit of use.
    Tpuu,
    /// Trade product.
    Tp,
    /// Medicinal product pack.
    Mpp,
    /// Medicinal product unit of use.
    Mpuu,
    /// Medicinal product.
    Mp,
}

impl Classification {
    /// All classifications in model order.
    pub const ALL: [Classification; 7] = [
        Classification::Ctpp,
        Classification::Tpp,
        Classification::Tpuu,
        Classification::Tp,
        Classification::Mpp,
        Classification::Mpuu,
        Classification::Mp,
    ];

    /// Returns the reference set whose members carry this classification.
    pub fn refset_id(self) -> SctId {
        match self {
            Classification::Ctpp => well_known::CTPP_REFSET,
            Classification::Tpp => well_known::TPP_REFSET,
            Classification::Tpuu => well_known::TPUU_REFSET,
            Classification::Tp => well_known::TP_REFSET,
            Classification::Mpp => well_known::MPP_REFSET,
            Classification::Mpuu => well_known::MPUU_REFSET,
            Classification::Mp => well_known::MP_REFSET,
        }
    }

    /// Returns the model concept that sits above every member in the
    /// subsumption hierarchy.
    pub fn anchor_id(self) -> SctId {
        match self {
            Classification::Ctpp => well_known::CTPP,
            Classification::Tpp => well_known::TPP,
            Classification::Tpuu => well_known::TPUU,
            Classification::Tp => well_known::TP,
            Classification::Mpp => well_known::MPP,
            Classification::Mpuu => well_known::MPUU,
            Classification::Mp => well_known::MP,
        }
    }

    /// Looks up a classification by its reference set id.
    pub fn from_refset_id(refset_id: SctId) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.refset_id() == refset_id)
    }

    /// Short upper-case name, e.g. `"CTPP"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Ctpp => "CTPP",
            Classification::Tpp => "TPP",
            Classification::Tpuu => "TPUU",
            Classification::Tp => "TP",
            Classification::Mpp => "MPP",
            Classification::Mpuu => "MPUU",
            Classification::Mp => "MP",
        }
    }

    /// Returns true for the pack level classifications.
    pub fn is_pack(self) -> bool {
        matches!(
            self,
            Classification::Ctpp | Classification::Tpp | Classification::Mpp
        )
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refset_round_trip() {
        for tag in Classification::ALL {
            assert_eq!(Classification::from_refset_id(tag.refset_id()), Some(tag));
        }
    }

    #[test]
    fn test_unknown_refset() {
        assert_eq!(Classification::from_refset_id(well_known::ARTG_ID_REFSET), None);
    }

    #[test]
    fn test_is_pack() {
        assert!(Classification::Ctpp.is_pack());
        assert!(Classification::Mpp.is_pack());
        assert!(!Classification::Tpuu.is_pack());
        assert!(!Classification::Mp.is_pack());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&Classification::Tpuu).unwrap();
        assert_eq!(json, "\"Tpuu\"");
    }
}
