//! amt2flatfile
//!
//! Command-line front end for flat file generation.

use std::path::PathBuf;

use amt_flatfile::{log_banner, FlatFileConfig, Pipeline, RunOptions, DEFAULT_JUNIT_PATH};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONTINUE_WARNING: &str = "Configured to continue regardless of detected errors. \
This is useful for testing pre-release AMT content, but is NOT recommended for any other use! \
Resultant AMT flat file may be unreliable. \
Consider rerunning with the -e or --exit-on-error flag set!!!";

#[derive(Parser)]
#[command(name = "amt2flatfile")]
#[command(about = "Generates the AMT flat file from an RF2 release", long_about = None)]
struct Cli {
    /// RF2 release directory or zip archive
    #[arg(short, long)]
    input_file: PathBuf,

    /// Output base path; .csv and .tsv are appended
    #[arg(short, long)]
    output_file: PathBuf,

    /// Abort on the first detected error instead of repairing or skipping
    #[arg(short, long)]
    exit_on_error: bool,

    /// JUnit report of detected errors
    #[arg(short, long, default_value = DEFAULT_JUNIT_PATH)]
    junit_file: PathBuf,

    /// Also write the replacement table to this base path
    #[arg(short, long)]
    replacements_output_file: Option<PathBuf>,

    /// Close the graph and project packs in parallel
    #[arg(long)]
    parallel: bool,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if !cli.exit_on_error {
        log_banner(CONTINUE_WARNING);
    }

    let config = FlatFileConfig::builder()
        .with_exit_on_error(cli.exit_on_error)
        .with_parallel(cli.parallel)
        .build();

    let mut options =
        RunOptions::new(&cli.input_file, &cli.output_file).with_junit_file(&cli.junit_file);
    if let Some(base) = &cli.replacements_output_file {
        options = options.with_replacements_output(base);
    }

    let summary = Pipeline::new(config).run(&options).with_context(|| {
        format!(
            "Failed to generate flat file from {}",
            cli.input_file.display()
        )
    })?;

    info!(
        ctpps = summary.ctpps,
        rows = summary.rows,
        replacements = summary.replacements,
        failures = summary.failures,
        content_model = %summary.content_model,
        "Done in {}ms",
        summary.elapsed_ms
    );
    if !summary.reliable {
        log_banner("Input data was repaired during this run, RESULTS MAY BE UNRELIABLE!!!");
    }
    for path in &summary.outputs {
        println!("{}", path.display());
    }
    Ok(())
}
