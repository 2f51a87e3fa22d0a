//! End-to-end generation: release in, flat files and report out.
//!
//! ```text
//! open release -> ingest -> close -> validate -> project -> write
//! ```
//!
//! Every stage reports to the same [`JUnitReport`], which is written even
//! when a stage aborts.

use std::path::{Path, PathBuf};
use std::time::Instant;

use amt_types::Classification;
use tracing::{error, info, warn};

use crate::classification::ContentModel;
use crate::config::FlatFileConfig;
use crate::error::{FlatFileError, FlatFileResult};
use crate::ingest::Ingestor;
use crate::output::{self, FileFormat};
use crate::projector::FlatFileProjector;
use crate::release::Release;
use crate::report::{Failure, JUnitReport, ReportSink, DEFAULT_JUNIT_PATH};
use crate::resolver::HierarchyResolver;
use crate::store::ReleaseContext;
use crate::validation::{ValidationEngine, ValidationOutcome};

/// Test case for closure failures.
pub const GRAPH_TEST_CASE: &str = "Graph errors";

/// Paths for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Release directory or zip archive.
    pub input: PathBuf,
    /// Flat file base path; `.csv` and `.tsv` are appended.
    pub output: PathBuf,
    /// Replacement table base path, if wanted.
    pub replacements_output: Option<PathBuf>,
    /// JUnit report path.
    pub junit_file: PathBuf,
}

impl RunOptions {
    /// Creates options with the default report path and no replacement table.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            replacements_output: None,
            junit_file: PathBuf::from(DEFAULT_JUNIT_PATH),
        }
    }

    /// Also writes the replacement table to `base`.
    pub fn with_replacements_output(mut self, base: impl Into<PathBuf>) -> Self {
        self.replacements_output = Some(base.into());
        self
    }

    /// Sets the JUnit report path.
    pub fn with_junit_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.junit_file = path.into();
        self
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = FileFormat::ALL
            .iter()
            .map(|format| format.file_path(&self.output))
            .collect();
        if let Some(base) = &self.replacements_output {
            paths.extend(FileFormat::ALL.iter().map(|format| format.file_path(base)));
        }
        paths.push(self.junit_file.clone());
        paths
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    /// Active CTPPs projected.
    pub ctpps: usize,
    /// Flat rows written.
    pub rows: usize,
    /// Replacement records loaded.
    pub replacements: usize,
    /// Failures in the report.
    pub failures: usize,
    /// Content model generation of the release.
    pub content_model: ContentModel,
    /// False if a repair changed the loaded content.
    pub reliable: bool,
    /// Files written, excluding the report.
    pub outputs: Vec<PathBuf>,
    /// Wall time of the run.
    pub elapsed_ms: u64,
}

/// Runs the generation stages with one configuration.
///
/// # Example
///
/// ```ignore
/// use amt_flatfile::{FlatFileConfig, Pipeline, RunOptions};
///
/// let pipeline = Pipeline::new(FlatFileConfig::default());
/// let options = RunOptions::new("release.zip", "out/amt")
///     .with_replacements_output("out/replacements");
///
/// let summary = pipeline.run(&options)?;
/// println!("{} rows, reliable: {}", summary.rows, summary.reliable);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: FlatFileConfig,
}

impl Pipeline {
    /// Creates a pipeline.
    pub fn new(config: FlatFileConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FlatFileConfig {
        &self.config
    }

    /// Runs all stages and writes the JUnit report, even if a stage fails.
    pub fn run(&self, options: &RunOptions) -> FlatFileResult<RunSummary> {
        let report = JUnitReport::new();
        let result = self.generate(options, &report);

        if let Err(e) = &result {
            error!("Generation aborted: {e}");
        }
        match report.write_to_path(&options.junit_file) {
            Ok(()) => info!(
                path = %options.junit_file.display(),
                failures = report.failure_count(),
                "Wrote validation report"
            ),
            Err(e) if result.is_ok() => return Err(e),
            Err(e) => error!("Could not write validation report: {e}"),
        }

        result.map(|summary| RunSummary {
            failures: report.failure_count(),
            ..summary
        })
    }

    /// Runs all stages, reporting to `report` without writing it.
    pub fn generate(
        &self,
        options: &RunOptions,
        report: &JUnitReport,
    ) -> FlatFileResult<RunSummary> {
        let start = Instant::now();
        for path in options.output_paths() {
            output::validate_output(&path)?;
        }

        let (ctx, outcome) = self.load(&options.input, report)?;

        let rows = {
            let mut resolver = HierarchyResolver::new(&ctx, report, self.config.exit_on_error);
            if let Some(cache) = &self.config.resolver_cache {
                resolver = resolver.with_cache(cache);
            }
            FlatFileProjector::new(resolver, &self.config).project()?
        };

        let mut outputs = Vec::new();
        for format in FileFormat::ALL {
            outputs.push(output::write_flat_file(&rows, &options.output, format)?);
        }
        if let Some(base) = &options.replacements_output {
            for format in FileFormat::ALL {
                outputs.push(output::write_replacements(&ctx, base, format)?);
            }
        }

        let summary = RunSummary {
            ctpps: ctx.classifications().len(Classification::Ctpp),
            rows: rows.len(),
            replacements: ctx.replacements().len(),
            failures: report.failure_count(),
            content_model: ctx.classifications().content_model(),
            reliable: outcome.is_reliable(),
            outputs,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            ctpps = summary.ctpps,
            rows = summary.rows,
            elapsed_ms = summary.elapsed_ms,
            "Flat file generation complete"
        );
        if !summary.reliable {
            warn!(
                rules = ?outcome.repaired_rules,
                "Input data was repaired, results may be unreliable"
            );
        }
        Ok(summary)
    }

    /// Opens, ingests, closes and validates a release.
    pub fn load(
        &self,
        input: &Path,
        sink: &dyn ReportSink,
    ) -> FlatFileResult<(ReleaseContext, ValidationOutcome)> {
        let release = Release::open(input)?;
        let mut ctx = Ingestor::new(sink, self.config.exit_on_error).load(&release)?;
        self.close(&mut ctx, sink)?;
        let outcome = ValidationEngine::new(sink, self.config.exit_on_error).run(&mut ctx)?;
        Ok((ctx, outcome))
    }

    /// Closes the graph, reporting a cycle.
    ///
    /// Outside exit-on-error mode the best-effort closure is kept.
    pub fn close(&self, ctx: &mut ReleaseContext, sink: &dyn ReportSink) -> FlatFileResult<()> {
        let err = match ctx.close(self.config.parallel) {
            Ok(stats) => {
                info!("Closed release graph: {stats}");
                return Ok(());
            }
            Err(err) => err,
        };

        sink.record(
            Failure::error(GRAPH_TEST_CASE, "Could not close graph. Elements missing")
                .with_detail(err.to_string())
                .with_origin(module_path!()),
        );
        if self.config.exit_on_error {
            return Err(FlatFileError::Closure(err));
        }
        warn!("Continuing with incomplete closure: {err}");
        Ok(())
    }
}
