// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single lifecycle event emitted by a test runner.
///
/// Serialized as one JSON object per line, discriminated by the `type` field.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "kebab-case")]
pub enum RunnerEventSummary {
    /// The run started.
    Begin {
        /// The configuration of the run.
        config: RunConfigSummary,
    },

    /// An execution attempt of a test started.
    TestBegin {
        /// The test being executed.
        test: TestCaseSummary,
        /// The execution attempt. Only timing and retry information is
        /// meaningful at this point.
        result: TestResultSummary,
    },

    /// An execution attempt of a test finished.
    TestEnd {
        /// The test that was executed.
        test: TestCaseSummary,
        /// The finished execution attempt.
        result: TestResultSummary,
    },

    /// A step within a test execution started.
    StepBegin {
        /// The [`TestCaseSummary::id`] of the owning test.
        test_id: String,
        /// The retry index of the owning execution.
        #[serde(default)]
        retry: u32,
        /// The step.
        step: TestStepSummary,
    },

    /// A step within a test execution finished.
    StepEnd {
        /// The [`TestCaseSummary::id`] of the owning test.
        test_id: String,
        /// The retry index of the owning execution.
        #[serde(default)]
        retry: u32,
        /// The step.
        step: TestStepSummary,
    },

    /// The run finished.
    End {
        /// The overall result of the run.
        result: RunResultSummary,
    },
}

/// Configuration of a test run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfigSummary {
    /// The directory test file paths are reported relative to.
    pub root_dir: Utf8PathBuf,

    /// Sharding information, if the run is one shard of a larger run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<ShardSummary>,

    /// The number of workers the runner uses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<u32>,

    /// The version of the test runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One shard out of a sharded run. `current` is 1-based.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ShardSummary {
    /// The index of this shard, starting at 1.
    pub current: u32,
    /// The total number of shards.
    pub total: u32,
}

/// A source location.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LocationSummary {
    /// The file, usually absolute.
    pub file: Utf8PathBuf,
    /// The 1-based line.
    pub line: u32,
    /// The 1-based column.
    pub column: u32,
}

/// A free-form annotation attached to a test.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AnnotationSummary {
    /// The annotation type, for example `issue` or `otel:team`.
    #[serde(rename = "type")]
    pub ty: String,

    /// The annotation's free-text value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A declared test case.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseSummary {
    /// A stable identifier, unique within the run.
    pub id: String,

    /// The test's own title.
    pub title: String,

    /// The full title path: `[root, project, file, describe..., title]`.
    pub title_path: Vec<String>,

    /// Where the test is declared.
    pub location: LocationSummary,

    /// Tags declared on the test, for example `@slow`.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Annotations attached to the test.
    #[serde(default)]
    pub annotations: Vec<AnnotationSummary>,

    /// The status the test is expected to finish with.
    #[serde(default)]
    pub expected_status: TestStatus,
}

/// One execution attempt of a test.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TestResultSummary {
    /// The retry index, 0 for the first attempt.
    #[serde(default)]
    pub retry: u32,

    /// The index of the worker that ran this attempt.
    #[serde(default)]
    pub worker_index: u32,

    /// When the attempt started, according to the runner.
    pub start_time: DateTime<FixedOffset>,

    /// How long the attempt took, in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,

    /// The actual status of the attempt.
    #[serde(default)]
    pub status: TestStatus,

    /// The error the attempt failed with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TestErrorSummary>,
}

/// An error reported by the runner for a test or a step.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TestErrorSummary {
    /// The error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// The stack trace, if the runner captured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// A step within a test execution.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TestStepSummary {
    /// A runner-assigned identifier, unique within the execution. Only used to
    /// link steps to their parents in the stream.
    pub id: String,

    /// The `id` of the enclosing step, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// The step title. May span several lines.
    pub title: String,

    /// The step category, for example `test.step` or `hook`.
    #[serde(default)]
    pub category: String,

    /// When the step started, according to the runner.
    pub start_time: DateTime<FixedOffset>,

    /// How long the step took, in milliseconds. Zero until the step ends.
    #[serde(default)]
    pub duration_ms: u64,

    /// Where the step is declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationSummary>,

    /// The error the step failed with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TestErrorSummary>,
}

/// The overall result of a run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RunResultSummary {
    /// The overall status.
    pub status: RunStatus,

    /// When the run started.
    pub start_time: DateTime<FixedOffset>,

    /// How long the run took, in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

/// The status of a test execution attempt.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TestStatus {
    /// The attempt passed.
    #[default]
    Passed,
    /// The attempt failed.
    Failed,
    /// The attempt ran past its timeout.
    TimedOut,
    /// The attempt was skipped.
    Skipped,
    /// The attempt was interrupted, for example by a cancelled run.
    Interrupted,
}

impl TestStatus {
    /// Returns the string used for this status on the wire and in span
    /// attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::TimedOut => "timed-out",
            TestStatus::Skipped => "skipped",
            TestStatus::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The overall status of a run.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Every test met its expectation.
    Passed,
    /// At least one test did not meet its expectation.
    Failed,
    /// The run hit its global timeout.
    TimedOut,
    /// The run was interrupted.
    Interrupted,
}

impl RunStatus {
    /// Returns the string used for this status on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
            RunStatus::TimedOut => "timed-out",
            RunStatus::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
