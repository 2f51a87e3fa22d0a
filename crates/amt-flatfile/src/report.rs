//! Failure reporting and the JUnit XML report.
//!
//! Every validation failure, resolver ambiguity and data error is recorded
//! through a [`ReportSink`] before any abort decision is made. The
//! [`JUnitReport`] sink merges failures by test case name and serialises
//! them as a JUnit suite so CI systems can display them.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use parking_lot::Mutex;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::debug;

use crate::error::{FlatFileError, FlatFileResult};

/// Name of the JUnit suite holding all failures.
pub const SUITE_NAME: &str = "validation.errors";

/// Default location of the JUnit report.
pub const DEFAULT_JUNIT_PATH: &str = "target/ValidationErrors.xml";

/// Failure severity, written as the JUnit failure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// A data error.
    Error,
    /// Advisory only.
    Warning,
}

impl Severity {
    /// Returns the JUnit type string.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        }
    }
}

/// A single reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Failure {
    /// Test case the failure is filed under.
    pub test_case: String,
    /// Component that raised it.
    pub origin: String,
    /// Short description.
    pub message: String,
    /// Offending concepts or other detail.
    pub detail: String,
    /// Severity.
    pub severity: Severity,
}

impl Failure {
    /// Creates an error-level failure with no detail.
    pub fn error(test_case: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            test_case: test_case.into(),
            origin: "amt_flatfile".to_string(),
            message: message.into(),
            detail: String::new(),
            severity: Severity::Error,
        }
    }

    /// Creates a warning-level failure with no detail.
    pub fn warning(test_case: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(test_case, message)
        }
    }

    /// Sets the detail text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Sets the originating component, usually `module_path!()`.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }
}

/// Receives failures from every stage of a run.
///
/// Implementations must tolerate concurrent calls from parallel projection.
pub trait ReportSink: Send + Sync {
    /// Records a failure.
    fn record(&self, failure: Failure);
}

/// One failure inside a [`TestCase`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaseFailure {
    /// Short description.
    pub message: String,
    /// Detail text.
    pub detail: String,
    /// Severity.
    pub severity: Severity,
}

/// Failures merged under one name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestCase {
    /// Test case name.
    pub name: String,
    /// Origin of the first failure filed under this name.
    pub class_name: String,
    /// Distinct failures in the order they were first seen.
    pub failures: Vec<CaseFailure>,
}

/// Thread-safe [`ReportSink`] that serialises to JUnit XML.
///
/// # Example
///
/// ```rust
/// use amt_flatfile::{Failure, JUnitReport, ReportSink};
///
/// let report = JUnitReport::new();
/// report.record(Failure::error("Inactive_CTPP", "Inactive CTPP found").with_detail("1 |pack|"));
/// report.record(Failure::error("Inactive_CTPP", "Inactive CTPP found").with_detail("1 |pack|"));
///
/// assert_eq!(report.failure_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct JUnitReport {
    cases: Mutex<CaseTable>,
}

/// Test cases in first-seen order, indexed by name.
#[derive(Debug, Default)]
struct CaseTable {
    cases: Vec<TestCase>,
    by_name: HashMap<String, usize>,
    seen: HashSet<(usize, CaseFailure)>,
}

impl CaseTable {
    fn get(&self, name: &str) -> Option<&TestCase> {
        self.by_name.get(name).map(|&i| &self.cases[i])
    }

    fn insert(&mut self, failure: Failure) {
        let entry = CaseFailure {
            message: failure.message,
            detail: failure.detail,
            severity: failure.severity,
        };

        let index = match self.by_name.get(&failure.test_case) {
            Some(&index) => index,
            None => {
                debug!(test_case = %failure.test_case, "New report test case");
                let index = self.cases.len();
                self.by_name.insert(failure.test_case.clone(), index);
                self.cases.push(TestCase {
                    name: failure.test_case,
                    class_name: failure.origin,
                    failures: Vec::new(),
                });
                index
            }
        };
        if self.seen.insert((index, entry.clone())) {
            self.cases[index].failures.push(entry);
        }
    }
}

impl JUnitReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all test cases.
    pub fn test_cases(&self) -> Vec<TestCase> {
        self.cases.lock().cases.clone()
    }

    /// Returns the test case with the given name.
    pub fn test_case(&self, name: &str) -> Option<TestCase> {
        self.cases.lock().get(name).cloned()
    }

    /// Returns true if a test case with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.cases.lock().by_name.contains_key(name)
    }

    /// Total number of distinct failures.
    pub fn failure_count(&self) -> usize {
        self.cases.lock().seen.len()
    }

    /// Returns true if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.cases.lock().cases.is_empty()
    }

    /// Writes the report as JUnit XML.
    pub fn write_xml<W: Write>(&self, out: W) -> FlatFileResult<()> {
        let cases = self.test_cases();
        let failures: usize = cases.iter().map(|c| c.failures.len()).sum();
        let tests = cases.len().to_string();
        let failures = failures.to_string();

        let mut writer = Writer::new_with_indent(out, b' ', 2);
        write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_event(&mut writer, Event::Start(BytesStart::new("testsuites")))?;

        let mut suite = BytesStart::new("testsuite");
        suite.push_attribute(("name", SUITE_NAME));
        suite.push_attribute(("tests", tests.as_str()));
        suite.push_attribute(("failures", failures.as_str()));
        suite.push_attribute(("errors", "0"));
        write_event(&mut writer, Event::Start(suite))?;

        for case in &cases {
            let class_name = format!("flatfile.{}", case.class_name);
            let mut element = BytesStart::new("testcase");
            element.push_attribute(("name", case.name.as_str()));
            element.push_attribute(("classname", class_name.as_str()));
            write_event(&mut writer, Event::Start(element))?;

            for failure in &case.failures {
                let mut element = BytesStart::new("failure");
                element.push_attribute(("message", failure.message.as_str()));
                element.push_attribute(("type", failure.severity.as_str()));
                write_event(&mut writer, Event::Start(element))?;
                write_event(&mut writer, Event::Text(BytesText::new(&failure.detail)))?;
                write_event(&mut writer, Event::End(BytesEnd::new("failure")))?;
            }

            write_event(&mut writer, Event::End(BytesEnd::new("testcase")))?;
        }

        write_event(&mut writer, Event::End(BytesEnd::new("testsuite")))?;
        write_event(&mut writer, Event::End(BytesEnd::new("testsuites")))?;
        writer
            .into_inner()
            .flush()
            .map_err(|e| FlatFileError::Report(e.to_string()))
    }

    /// Writes the report to a file, creating parent directories.
    pub fn write_to_path(&self, path: &Path) -> FlatFileResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| FlatFileError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| FlatFileError::io(path, e))?;
        self.write_xml(BufWriter::new(file))
    }
}

impl ReportSink for JUnitReport {
    fn record(&self, failure: Failure) {
        self.cases.lock().insert(failure);
    }
}

fn write_event<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> FlatFileResult<()> {
    writer
        .write_event(event)
        .map_err(|e| FlatFileError::Report(e.to_string()))
}
