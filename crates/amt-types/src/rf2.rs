//! Typed RF2 snapshot rows.
//!
//! Each record is built from the fields of one tab-delimited line (header
//! already skipped) with [`split_row`]. Identifier, flag and date columns
//! are parsed with `nom`; free-text columns are kept as-is.
//!
//! # Example
//!
//! ```
//! use amt_types::rf2::{split_row, Rf2Relationship};
//!
//! let line = "1\t20180430\t1\t32506021000036107\t21\t31\t0\t116680003\t900000000000011006\t900000000000451002";
//! let rel = Rf2Relationship::from_fields(&split_row(line)).unwrap();
//! assert_eq!(rel.source_id, 21);
//! assert_eq!(rel.destination_id, 31);
//! assert!(rel.is_is_a());
//! ```

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::digit1;
use nom::combinator::{all_consuming, map_res, value};
use nom::IResult;

use crate::error::{Rf2Error, Rf2Result};
use crate::{well_known, SctId};

/// Splits one RF2 line into its fields.
///
/// Trailing line terminators are removed and empty trailing fields are kept,
/// so a row always has as many fields as the file has columns.
pub fn split_row(line: &str) -> Vec<&str> {
    line.trim_end_matches(|c| c == '\r' || c == '\n')
        .split('\t')
        .collect()
}

// =============================================================================
// Field parsers
// =============================================================================

fn sctid(input: &str) -> IResult<&str, SctId> {
    map_res(digit1, str::parse::<SctId>)(input)
}

fn active_flag(input: &str) -> IResult<&str, bool> {
    alt((value(true, tag("1")), value(false, tag("0"))))(input)
}

fn effective_time(input: &str) -> IResult<&str, u32> {
    map_res(take_while_m_n(8, 8, |c: char| c.is_ascii_digit()), str::parse::<u32>)(input)
}

fn small_int(input: &str) -> IResult<&str, u16> {
    map_res(digit1, str::parse::<u16>)(input)
}

fn raw<'a>(fields: &[&'a str], index: usize, column: &'static str) -> Rf2Result<&'a str> {
    fields.get(index).copied().ok_or(Rf2Error::MissingColumn {
        column,
        index,
        found: fields.len(),
    })
}

fn parse_field<'a, T>(
    fields: &[&'a str],
    index: usize,
    column: &'static str,
    parser: fn(&'a str) -> IResult<&'a str, T>,
) -> Rf2Result<T> {
    let value = raw(fields, index, column)?;
    all_consuming(parser)(value)
        .map(|(_, parsed)| parsed)
        .map_err(|_| Rf2Error::InvalidField {
            column,
            value: value.to_string(),
        })
}

/// The columns every RF2 component and member row starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rf2Header {
    /// Effective date in YYYYMMDD format.
    pub effective_time: u32,
    /// Whether the row is active.
    pub active: bool,
    /// The module containing the row.
    pub module_id: SctId,
}

impl Rf2Header {
    fn from_fields(fields: &[&str]) -> Rf2Result<Self> {
        Ok(Self {
            effective_time: parse_field(fields, 1, "effectiveTime", effective_time)?,
            active: parse_field(fields, 2, "active", active_flag)?,
            module_id: parse_field(fields, 3, "moduleId", sctid)?,
        })
    }
}

// =============================================================================
// Components
// =============================================================================

/// A row of `sct2_Concept_Snapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rf2Concept {
    /// Concept id.
    pub id: SctId,
    /// Effective date in YYYYMMDD format.
    pub effective_time: u32,
    /// Whether the concept is active.
    pub active: bool,
    /// The module containing the concept.
    pub module_id: SctId,
    /// Primitive or fully defined.
    pub definition_status_id: SctId,
}

impl Rf2Concept {
    /// Builds the row from its fields.
    pub fn from_fields(fields: &[&str]) -> Rf2Result<Self> {
        let header = Rf2Header::from_fields(fields)?;
        Ok(Self {
            id: parse_field(fields, 0, "id", sctid)?,
            effective_time: header.effective_time,
            active: header.active,
            module_id: header.module_id,
            definition_status_id: parse_field(fields, 4, "definitionStatusId", sctid)?,
        })
    }
}

/// A row of `sct2_Relationship_Snapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rf2Relationship {
    /// Relationship id.
    pub id: SctId,
    /// Effective date in YYYYMMDD format.
    pub effective_time: u32,
    /// Whether the relationship is active.
    pub active: bool,
    /// The module containing the relationship.
    pub module_id: SctId,
    /// Source concept.
    pub source_id: SctId,
    /// Destination concept.
    pub destination_id: SctId,
    /// Role group (0 = ungrouped).
    pub relationship_group: u16,
    /// Relationship type.
    pub type_id: SctId,
    /// Stated or inferred.
    pub characteristic_type_id: SctId,
    /// Existential or universal.
    pub modifier_id: SctId,
}

impl Rf2Relationship {
    /// Builds the row from its fields.
    pub fn from_fields(fields: &[&str]) -> Rf2Result<Self> {
        let header = Rf2Header::from_fields(fields)?;
        Ok(Self {
            id: parse_field(fields, 0, "id", sctid)?,
            effective_time: header.effective_time,
            active: header.active,
            module_id: header.module_id,
            source_id: parse_field(fields, 4, "sourceId", sctid)?,
            destination_id: parse_field(fields, 5, "destinationId", sctid)?,
            relationship_group: parse_field(fields, 6, "relationshipGroup", small_int)?,
            type_id: parse_field(fields, 7, "typeId", sctid)?,
            characteristic_type_id: parse_field(fields, 8, "characteristicTypeId", sctid)?,
            modifier_id: parse_field(fields, 9, "modifierId", sctid)?,
        })
    }

    /// Returns true if this is a subsumption relationship.
    pub fn is_is_a(&self) -> bool {
        self.type_id == well_known::IS_A
    }
}

/// A row of `sct2_Description_Snapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rf2Description {
    /// Description id.
    pub id: SctId,
    /// Effective date in YYYYMMDD format.
    pub effective_time: u32,
    /// Whether the description is active.
    pub active: bool,
    /// The module containing the description.
    pub module_id: SctId,
    /// The described concept.
    pub concept_id: SctId,
    /// Language code, e.g. `en`.
    pub language_code: String,
    /// FSN or synonym.
    pub type_id: SctId,
    /// The term text.
    pub term: String,
    /// Case significance.
    pub case_significance_id: SctId,
}

impl Rf2Description {
    /// Builds the row from its fields.
    pub fn from_fields(fields: &[&str]) -> Rf2Result<Self> {
        let header = Rf2Header::from_fields(fields)?;
        Ok(Self {
            id: parse_field(fields, 0, "id", sctid)?,
            effective_time: header.effective_time,
            active: header.active,
            module_id: header.module_id,
            concept_id: parse_field(fields, 4, "conceptId", sctid)?,
            language_code: raw(fields, 5, "languageCode")?.to_string(),
            type_id: parse_field(fields, 6, "typeId", sctid)?,
            term: raw(fields, 7, "term")?.to_string(),
            case_significance_id: parse_field(fields, 8, "caseSignificanceId", sctid)?,
        })
    }

    /// Returns true if this is a fully specified name.
    pub fn is_fsn(&self) -> bool {
        self.type_id == well_known::FSN
    }
}

// =============================================================================
// Reference set members
// =============================================================================

/// A simple reference set member (product model refsets).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rf2RefsetMember {
    /// Member UUID.
    pub id: String,
    /// Effective date in YYYYMMDD format.
    pub effective_time: u32,
    /// Whether the membership is active.
    pub active: bool,
    /// The module containing the member.
    pub module_id: SctId,
    /// The reference set.
    pub refset_id: SctId,
    /// The member component.
    pub referenced_component_id: SctId,
}

impl Rf2RefsetMember {
    /// Builds the row from its fields.
    pub fn from_fields(fields: &[&str]) -> Rf2Result<Self> {
        let header = Rf2Header::from_fields(fields)?;
        Ok(Self {
            id: raw(fields, 0, "id")?.to_string(),
            effective_time: header.effective_time,
            active: header.active,
            module_id: header.module_id,
            refset_id: parse_field(fields, 4, "refsetId", sctid)?,
            referenced_component_id: parse_field(fields, 5, "referencedComponentId", sctid)?,
        })
    }
}

/// A language reference set member.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rf2LanguageMember {
    /// The underlying membership.
    pub member: Rf2RefsetMember,
    /// Preferred or acceptable.
    pub acceptability_id: SctId,
}

impl Rf2LanguageMember {
    /// Builds the row from its fields.
    pub fn from_fields(fields: &[&str]) -> Rf2Result<Self> {
        Ok(Self {
            member: Rf2RefsetMember::from_fields(fields)?,
            acceptability_id: parse_field(fields, 6, "acceptabilityId", sctid)?,
        })
    }

    /// Returns true if the referenced description is preferred.
    pub fn is_preferred(&self) -> bool {
        self.acceptability_id == well_known::PREFERRED
    }
}

/// A string-valued reference set member (ARTG ids).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rf2StringMember {
    /// The underlying membership.
    pub member: Rf2RefsetMember,
    /// The string value.
    pub value: String,
}

impl Rf2StringMember {
    /// Builds the row from its fields.
    pub fn from_fields(fields: &[&str]) -> Rf2Result<Self> {
        Ok(Self {
            member: Rf2RefsetMember::from_fields(fields)?,
            value: raw(fields, 6, "value")?.to_string(),
        })
    }
}

/// An association reference set member (historical associations).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rf2AssociationMember {
    /// The underlying membership.
    pub member: Rf2RefsetMember,
    /// The associated (replacement) component.
    pub target_component_id: SctId,
}

impl Rf2AssociationMember {
    /// Builds the row from its fields.
    pub fn from_fields(fields: &[&str]) -> Rf2Result<Self> {
        Ok(Self {
            member: Rf2RefsetMember::from_fields(fields)?,
            target_component_id: parse_field(fields, 6, "targetComponentId", sctid)?,
        })
    }

    /// Returns true if the refset is a recognised historical association.
    pub fn is_historical_association(&self) -> bool {
        well_known::is_historical_association(self.member.refset_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_row_keeps_empty_trailing_fields() {
        assert_eq!(split_row("a\tb\t\t\r\n"), vec!["a", "b", "", ""]);
    }

    #[test]
    fn test_concept_row() {
        let fields = split_row("21433011000036107\t20180430\t0\t900062011000036108\t900000000000074008");
        let concept = Rf2Concept::from_fields(&fields).unwrap();
        assert_eq!(concept.id, 21433011000036107);
        assert_eq!(concept.effective_time, 20180430);
        assert!(!concept.active);
        assert_eq!(concept.module_id, well_known::AMT_MODULE);
    }

    #[test]
    fn test_invalid_active_flag() {
        let fields = split_row("1\t20180430\tyes\t1\t1");
        let err = Rf2Concept::from_fields(&fields).unwrap_err();
        assert_eq!(
            err,
            Rf2Error::InvalidField {
                column: "active",
                value: "yes".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_effective_time() {
        let fields = split_row("1\t2018043\t1\t1\t1");
        assert!(matches!(
            Rf2Concept::from_fields(&fields),
            Err(Rf2Error::InvalidField {
                column: "effectiveTime",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_column() {
        let fields = split_row("1\t20180430\t1\t1");
        assert_eq!(
            Rf2Concept::from_fields(&fields).unwrap_err(),
            Rf2Error::MissingColumn {
                column: "definitionStatusId",
                index: 4,
                found: 4
            }
        );
    }

    #[test]
    fn test_description_row_keeps_term() {
        let line = "1201111000036116\t20180430\t1\t900062011000036108\t21433011000036107\ten\t900000000000003001\tparacetamol 500 mg tablet (medicinal product unit of use)\t900000000000448009";
        let description = Rf2Description::from_fields(&split_row(line)).unwrap();
        assert!(description.is_fsn());
        assert_eq!(description.concept_id, 21433011000036107);
        assert_eq!(
            description.term,
            "paracetamol 500 mg tablet (medicinal product unit of use)"
        );
    }

    #[test]
    fn test_language_member() {
        let line = "1a2b\t20180430\t1\t32506021000036107\t32570271000036106\t1201111000036116\t900000000000548007";
        let member = Rf2LanguageMember::from_fields(&split_row(line)).unwrap();
        assert!(member.is_preferred());
        assert_eq!(member.member.referenced_component_id, 1201111000036116);
    }

    #[test]
    fn test_string_member_allows_empty_value() {
        let line = "uuid\t20180430\t1\t32506021000036107\t11000168105\t933225691000036100\t";
        let member = Rf2StringMember::from_fields(&split_row(line)).unwrap();
        assert_eq!(member.member.refset_id, well_known::ARTG_ID_REFSET);
        assert_eq!(member.value, "");
    }

    #[test]
    fn test_association_member() {
        let line = "uuid\t20180430\t1\t32506021000036107\t900000000000526001\t21433011000036107\t21444011000036100";
        let member = Rf2AssociationMember::from_fields(&split_row(line)).unwrap();
        assert!(member.is_historical_association());
        assert_eq!(member.target_component_id, 21444011000036100);
    }
}
