// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test run, test case, result and step types passed to reporters.
//!
//! These are the runner-facing counterparts of the summaries in
//! [`testspan_metadata`]. Steps form a tree through [`TestStep::parent`].

use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use std::{
    fmt,
    sync::Arc,
    time::{Duration, SystemTime},
};
use testspan_metadata::{
    AnnotationSummary, LocationSummary, RunConfigSummary, RunResultSummary, TestCaseSummary,
    TestErrorSummary, TestResultSummary,
};

pub use testspan_metadata::{RunStatus, TestStatus};

/// Configuration of a test run, as reported by the runner when the run begins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// The directory test file paths are reported relative to.
    pub root_dir: Utf8PathBuf,

    /// The shard this run covers, if the suite is sharded.
    pub shard: Option<Shard>,

    /// The number of workers running tests in parallel.
    pub workers: Option<u32>,

    /// The version of the test runner.
    pub version: Option<String>,
}

impl RunConfig {
    /// Creates a new `RunConfig` with the given root directory.
    pub fn new(root_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Default::default()
        }
    }
}

impl From<RunConfigSummary> for RunConfig {
    fn from(summary: RunConfigSummary) -> Self {
        Self {
            root_dir: summary.root_dir,
            shard: summary.shard.map(|shard| Shard {
                current: shard.current,
                total: shard.total,
            }),
            workers: summary.workers,
            version: summary.version,
        }
    }
}

/// A shard of a test suite.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Shard {
    /// The 1-based shard index.
    pub current: u32,

    /// The total number of shards.
    pub total: u32,
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.total)
    }
}

/// A position in a source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// The file, usually absolute.
    pub file: Utf8PathBuf,

    /// 1-based line.
    pub line: u32,

    /// 1-based column.
    pub column: u32,
}

impl Location {
    /// Creates a new location.
    pub fn new(file: impl Into<Utf8PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl From<LocationSummary> for Location {
    fn from(summary: LocationSummary) -> Self {
        Self::new(summary.file, summary.line, summary.column)
    }
}

/// A type/description pair attached to a test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    /// The annotation type.
    pub ty: String,

    /// Free-form description.
    pub description: Option<String>,
}

impl Annotation {
    /// Creates a new annotation.
    pub fn new(ty: impl Into<String>, description: Option<String>) -> Self {
        Self {
            ty: ty.into(),
            description,
        }
    }
}

impl From<AnnotationSummary> for Annotation {
    fn from(summary: AnnotationSummary) -> Self {
        Self::new(summary.ty, summary.description)
    }
}

/// A declared test case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    /// A stable identifier, unique within the run.
    pub id: String,

    /// The test's own title.
    pub title: String,

    /// `[root, project, file, describe..., title]`.
    pub title_path: Vec<String>,

    /// Where the test is declared.
    pub location: Location,

    /// Declared tags, in declaration order.
    pub tags: Vec<String>,

    /// Attached annotations.
    pub annotations: Vec<Annotation>,

    /// The status the test is expected to finish with.
    pub expected_status: TestStatus,
}

impl TestCase {
    /// Number of leading title path segments that are not describe blocks or
    /// the test title: root, project and file.
    const TITLE_PATH_PREFIX: usize = 3;

    /// Returns the project name, if one is set.
    pub fn project_name(&self) -> Option<&str> {
        self.title_path
            .get(1)
            .map(|name| name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Returns the describe chain followed by the test title.
    pub fn titles(&self) -> &[String] {
        self.title_path
            .get(Self::TITLE_PATH_PREFIX..)
            .unwrap_or_default()
    }

    /// Returns the describe chain, without the test title.
    pub fn describe_titles(&self) -> &[String] {
        match self.titles() {
            [describe @ .., _] => describe,
            [] => &[],
        }
    }
}

impl From<TestCaseSummary> for TestCase {
    fn from(summary: TestCaseSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            title_path: summary.title_path,
            location: summary.location.into(),
            tags: summary.tags,
            annotations: summary.annotations.into_iter().map(Into::into).collect(),
            expected_status: summary.expected_status,
        }
    }
}

/// An error reported for a test execution or a step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestError {
    /// The error message.
    pub message: Option<String>,

    /// The stack trace.
    pub stack: Option<String>,
}

impl TestError {
    /// Creates an error with the given message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            stack: None,
        }
    }

    /// Returns the message, or an empty string if there is none.
    pub fn message_or_empty(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }
}

impl From<TestErrorSummary> for TestError {
    fn from(summary: TestErrorSummary) -> Self {
        Self {
            message: summary.message,
            stack: summary.stack,
        }
    }
}

/// How a test execution ended relative to what was expected of it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TestOutcome {
    /// The test was skipped.
    Skipped,

    /// The test finished with its expected status on the first attempt.
    Expected,

    /// The test finished with its expected status after a retry.
    Flaky,

    /// The test did not finish with its expected status.
    Unexpected,
}

impl TestOutcome {
    /// Returns the string used for this outcome in span attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Expected => "expected",
            Self::Flaky => "flaky",
            Self::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution attempt of a test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestResult {
    /// 0 for the first attempt.
    pub retry: u32,

    /// The worker the attempt ran on.
    pub worker_index: u32,

    /// When the attempt started.
    pub start_time: DateTime<FixedOffset>,

    /// How long the attempt ran.
    pub duration: Duration,

    /// The status the attempt finished with. Meaningless until the test ends.
    pub status: TestStatus,

    /// The first error reported by the attempt.
    pub error: Option<TestError>,
}

impl TestResult {
    /// Returns the start time as a `SystemTime`.
    pub fn start_system_time(&self) -> SystemTime {
        SystemTime::from(self.start_time)
    }

    /// Returns the end time: the start time plus the duration.
    pub fn end_system_time(&self) -> SystemTime {
        end_time(self.start_system_time(), self.duration)
    }

    /// Returns true if this attempt counts as passing for the given expected
    /// status.
    ///
    /// Skipped attempts always pass.
    pub fn is_passing(&self, expected: TestStatus) -> bool {
        self.status == TestStatus::Skipped || self.status == expected
    }

    /// Classifies this attempt against the given expected status.
    pub fn outcome(&self, expected: TestStatus) -> TestOutcome {
        if self.status == TestStatus::Skipped {
            TestOutcome::Skipped
        } else if self.status != expected {
            TestOutcome::Unexpected
        } else if self.retry > 0 {
            TestOutcome::Flaky
        } else {
            TestOutcome::Expected
        }
    }
}

impl From<TestResultSummary> for TestResult {
    fn from(summary: TestResultSummary) -> Self {
        Self {
            retry: summary.retry,
            worker_index: summary.worker_index,
            start_time: summary.start_time,
            duration: Duration::from_millis(summary.duration_ms),
            status: summary.status,
            error: summary.error.map(Into::into),
        }
    }
}

/// A step within a test execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestStep {
    /// The step title. May span several lines.
    pub title: String,

    /// The step category, for example `test.step` or `hook`.
    pub category: String,

    /// When the step started.
    pub start_time: DateTime<FixedOffset>,

    /// How long the step ran. Meaningless until the step ends.
    pub duration: Duration,

    /// Where the step is declared.
    pub location: Option<Location>,

    /// The error the step failed with, if any.
    pub error: Option<TestError>,

    /// The enclosing step.
    pub parent: Option<Arc<TestStep>>,
}

impl TestStep {
    /// Creates a top-level step with no duration, location, or error.
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        start_time: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            start_time,
            duration: Duration::ZERO,
            location: None,
            error: None,
            parent: None,
        }
    }

    /// Sets the enclosing step.
    pub fn with_parent(mut self, parent: Arc<TestStep>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Returns the titles of the enclosing steps and this step, outermost
    /// first.
    pub fn title_path(&self) -> Vec<&str> {
        let mut titles = vec![self.title.as_str()];
        let mut current = self.parent.as_deref();
        while let Some(step) = current {
            titles.push(step.title.as_str());
            current = step.parent.as_deref();
        }
        titles.reverse();
        titles
    }

    /// Returns the start time as a `SystemTime`.
    pub fn start_system_time(&self) -> SystemTime {
        SystemTime::from(self.start_time)
    }

    /// Returns the end time: the start time plus the duration.
    pub fn end_system_time(&self) -> SystemTime {
        end_time(self.start_system_time(), self.duration)
    }
}

/// The result of a whole run, reported when the run ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    /// The overall status.
    pub status: RunStatus,

    /// When the run started.
    pub start_time: DateTime<FixedOffset>,

    /// How long the run took.
    pub duration: Duration,
}

impl From<RunResultSummary> for RunResult {
    fn from(summary: RunResultSummary) -> Self {
        Self {
            status: summary.status,
            start_time: summary.start_time,
            duration: Duration::from_millis(summary.duration_ms),
        }
    }
}

fn end_time(start: SystemTime, duration: Duration) -> SystemTime {
    // Durations past the representable range clamp to the start.
    start.checked_add(duration).unwrap_or(start)
}
