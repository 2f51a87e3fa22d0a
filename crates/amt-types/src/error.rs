//! Error types for RF2 row parsing.

use thiserror::Error;

/// Errors that can occur while turning RF2 fields into typed rows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rf2Error {
    /// A row had fewer columns than the file kind requires.
    #[error("row has {found} columns, column {index} ({column}) is required")]
    MissingColumn {
        /// Name of the missing column.
        column: &'static str,
        /// Zero based index of the missing column.
        index: usize,
        /// Number of columns actually present.
        found: usize,
    },

    /// A column value could not be parsed.
    #[error("invalid {column} value {value:?}")]
    InvalidField {
        /// Name of the offending column.
        column: &'static str,
        /// The raw value.
        value: String,
    },
}

/// Result type for RF2 parsing.
pub type Rf2Result<T> = std::result::Result<T, Rf2Error>;
