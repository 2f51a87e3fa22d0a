//! Historical-association replacements for inactive concepts.

use amt_types::SctId;
use chrono::NaiveDate;

/// An inactive concept mapped to its successor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Replacement {
    /// The concept being replaced.
    pub inactive_id: SctId,
    /// The historical association refset, which names the replacement kind.
    pub replacement_type_id: SctId,
    /// The replacement concept.
    pub replacement_id: SctId,
    /// Effective date of the association row.
    pub effective_date: NaiveDate,
}

impl Replacement {
    /// Effective date in RF2 `YYYYMMDD` form.
    pub fn date_string(&self) -> String {
        self.effective_date.format("%Y%m%d").to_string()
    }
}

/// Parses an RF2 effective time into a date.
pub fn parse_effective_time(effective_time: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        (effective_time / 10_000) as i32,
        effective_time / 100 % 100,
        effective_time % 100,
    )
}

/// Replacement records, sorted once ingestion finishes.
#[derive(Debug, Clone, Default)]
pub struct ReplacementIndex {
    entries: Vec<Replacement>,
}

impl ReplacementIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record.
    pub fn push(&mut self, replacement: Replacement) {
        self.entries.push(replacement);
    }

    /// Returns all records.
    pub fn entries(&self) -> &[Replacement] {
        &self.entries
    }

    /// Records replacing the given inactive concept.
    pub fn replacements_for(&self, inactive_id: SctId) -> impl Iterator<Item = &Replacement> + '_ {
        self.entries
            .iter()
            .filter(move |r| r.inactive_id == inactive_id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorts records by inactive concept, type, replacement and date.
    pub(crate) fn sort(&mut self) {
        self.entries.sort_by_key(|r| {
            (
                r.inactive_id,
                r.replacement_type_id,
                r.replacement_id,
                r.effective_date,
            )
        });
    }
}
