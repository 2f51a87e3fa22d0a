//! Error types for flat file generation.

use std::path::PathBuf;

use amt_graph::GraphError;
use amt_types::{Rf2Error, SctId};
use thiserror::Error;

/// Errors that abort flat file generation.
///
/// Every abort caused by release content is recorded in the report sink
/// before the error is returned, so the JUnit report always explains it.
#[derive(Error, Debug)]
pub enum FlatFileError {
    /// A release row could not be parsed.
    #[error("failed processing row {line} of {file}: {source}")]
    Row {
        /// Release file name.
        file: String,
        /// One-based line number.
        line: usize,
        /// Underlying parse error.
        #[source]
        source: Rf2Error,
    },

    /// A release row could not be parsed; the caller adds the location.
    #[error("invalid RF2 row: {0}")]
    Parse(#[from] Rf2Error),

    /// The transitive closure could not be completed.
    #[error("closure failed: {0}")]
    Closure(#[from] GraphError),

    /// A validation rule matched and was not repaired.
    #[error("validation rule {code} matched {count} concept(s)")]
    Validation {
        /// Rule code.
        code: &'static str,
        /// Number of offending concepts.
        count: usize,
    },

    /// Pack concepts have the wrong shape in the hierarchy.
    #[error("hierarchy error: {0}")]
    Hierarchy(String),

    /// A concept classified CTPP is inactive.
    #[error("inactive CTPP found: {0}")]
    InactivePack(SctId),

    /// A hierarchy lookup did not produce the required result.
    #[error("resolution failed: {0}")]
    Resolution(String),

    /// A historical association references a concept that is not loaded.
    #[error("replacement record {member_id} references missing concept(s)")]
    Replacement {
        /// Refset member id of the association row.
        member_id: String,
    },

    /// A mandatory release file was not found.
    #[error("release does not contain a {0} file")]
    MissingReleaseFile(&'static str),

    /// The input path failed validation.
    #[error("invalid input {}: {reason}", path.display())]
    InvalidInput {
        /// Offending path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// An output path failed validation.
    #[error("invalid output {}: {reason}", path.display())]
    InvalidOutput {
        /// Offending path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// The release archive could not be read.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error with the path being accessed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The JUnit report could not be serialised.
    #[error("report error: {0}")]
    Report(String),
}

impl FlatFileError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FlatFileError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for flat file operations.
pub type FlatFileResult<T> = std::result::Result<T, FlatFileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = FlatFileError::Validation {
            code: "Inactive_with_Units",
            count: 3,
        };
        assert_eq!(
            err.to_string(),
            "validation rule Inactive_with_Units matched 3 concept(s)"
        );
    }

    #[test]
    fn test_error_display_inactive_pack() {
        let err = FlatFileError::InactivePack(1234);
        assert_eq!(err.to_string(), "inactive CTPP found: 1234");
    }

    #[test]
    fn test_error_display_missing_file() {
        let err = FlatFileError::MissingReleaseFile("concept");
        assert_eq!(err.to_string(), "release does not contain a concept file");
    }

    #[test]
    fn test_error_display_row() {
        let err = FlatFileError::Row {
            file: "sct2_Concept_Snapshot_AU1000036_20240131.txt".to_string(),
            line: 7,
            source: Rf2Error::InvalidField {
                column: "active",
                value: "x".to_string(),
            },
        };
        assert!(err
            .to_string()
            .starts_with("failed processing row 7 of sct2_Concept_Snapshot"));
    }

    #[test]
    fn test_error_from_graph() {
        let err: FlatFileError = GraphError::Cycle {
            concepts: vec![1, 2],
        }
        .into();
        assert!(matches!(err, FlatFileError::Closure(_)));
    }
}
