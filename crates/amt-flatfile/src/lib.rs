//! # amt-flatfile
//!
//! Generates the denormalised AMT flat file from an RF2 release.
//!
//! The Australian Medicines Terminology models each pack as a chain of
//! product concepts. This crate loads a release, checks and repairs the
//! product model, and flattens every active CTPP into rows that name the
//! whole chain at once.
//!
//! ## Quick Start
//!
//! ```ignore
//! use amt_flatfile::{FlatFileConfig, Pipeline, RunOptions};
//!
//! let config = FlatFileConfig::builder()
//!     .with_exit_on_error(true)
//!     .build();
//!
//! let options = RunOptions::new("NCTS_SCT_RF2_DISTRIBUTION.zip", "out/amt")
//!     .with_replacements_output("out/replacements");
//!
//! let summary = Pipeline::new(config).run(&options)?;
//! println!("{} CTPPs, {} rows", summary.ctpps, summary.rows);
//! ```
//!
//! ## Stages
//!
//! | Stage | Type | Result |
//! |-------|------|--------|
//! | Discovery | [`Release`] | snapshot files in a directory or zip |
//! | Ingestion | [`Ingestor`] | [`ReleaseContext`] with concepts, links, classifications |
//! | Closure | [`ReleaseContext::close`] | ancestor sets in the graph |
//! | Validation | [`ValidationEngine`] | repaired context or an abort |
//! | Resolution | [`HierarchyResolver`] | nearest ancestors of a classification |
//! | Projection | [`FlatFileProjector`] | [`FlatRow`]s |
//! | Output | [`write_flat_file`], [`JUnitReport`] | CSV, TSV and JUnit XML |
//!
//! ## Error Policy
//!
//! Every problem is recorded in a [`ReportSink`] first. Whether it then
//! aborts the run depends only on `exit_on_error`: without it, rules with a
//! repair are applied and unresolvable packs are skipped, and the
//! [`RunSummary`] says whether the output is reliable.
//!
//! ## Feature Flags
//!
//! - `parallel` - closes the graph and projects CTPPs on the rayon pool.
//!   Row order is the same as the sequential run.
//! - `serde` - derives `Serialize`/`Deserialize` for rows, concepts and the
//!   run summary.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod cache;
mod classification;
mod concept;
mod config;
mod error;
mod ingest;
mod output;
mod pipeline;
mod projector;
mod release;
mod replacement;
mod report;
mod resolver;
mod store;
mod validation;

pub use cache::{AncestorCache, CacheStats};
pub use classification::{ClassificationIndex, ContentModel};
pub use concept::Concept;
pub use config::{
    FlatFileConfig, FlatFileConfigBuilder, ResolverCacheConfig, DEFAULT_PROGRESS_INTERVAL,
};
pub use error::{FlatFileError, FlatFileResult};
pub use ingest::{Ingestor, REPLACEMENT_TEST_CASE};
pub use output::{
    quote, validate_output, write_flat_file, write_records, write_replacements, FileFormat,
    FLAT_FILE_HEADER, REPLACEMENT_HEADER,
};
pub use pipeline::{Pipeline, RunOptions, RunSummary, GRAPH_TEST_CASE};
pub use projector::{FlatFileProjector, FlatRow};
pub use release::{
    validate_input, Release, ReleaseFile, ReleaseFileKind, ReleaseFiles, MAX_ARCHIVE_SIZE,
};
pub use replacement::{parse_effective_time, Replacement, ReplacementIndex};
pub use report::{
    CaseFailure, Failure, JUnitReport, ReportSink, Severity, TestCase, DEFAULT_JUNIT_PATH,
    SUITE_NAME,
};
pub use resolver::{HierarchyResolver, MpResolution};
pub use store::ReleaseContext;
pub use validation::{
    log_banner, HierarchyIssues, Repair, Rule, ValidationEngine, ValidationOutcome,
    HIERARCHY_TEST_CASE, INACTIVE_CTPP_TEST_CASE,
};

pub use amt_graph::{ClosureStats, GraphError};
pub use amt_types::{Classification, LinkKind, SctId};
