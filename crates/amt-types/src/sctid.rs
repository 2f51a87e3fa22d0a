//! Helpers for inspecting SCTID structure.
//!
//! An SCTID ends with a partition identifier followed by a Verhoeff check
//! digit. The second partition digit tells which kind of component the
//! identifier names.

use crate::SctId;

/// The component kind encoded in an SCTID partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Concept identifier (partition `00` or `10`).
    Concept,
    /// Description identifier (partition `01` or `11`).
    Description,
    /// Relationship identifier (partition `02` or `12`).
    Relationship,
    /// Anything else.
    Other,
}

/// Returns the component kind of an identifier.
pub fn component_kind(id: SctId) -> ComponentKind {
    match (id / 10) % 10 {
        0 => ComponentKind::Concept,
        1 => ComponentKind::Description,
        2 => ComponentKind::Relationship,
        _ => ComponentKind::Other,
    }
}

/// Returns true if the identifier names a description.
pub fn is_description_id(id: SctId) -> bool {
    component_kind(id) == ComponentKind::Description
}
