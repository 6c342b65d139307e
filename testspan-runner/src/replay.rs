// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replaying a recorded runner event stream into a [`Reporter`].
//!
//! Runners that are not written in Rust describe their lifecycle as JSON
//! lines (see [`testspan_metadata::RunnerEventSummary`]). The replayer turns
//! the summaries back into model types, rebuilds step trees from the step ids
//! and forwards each event to the reporter.

use crate::{
    errors::ReplayError,
    model::{RunConfig, RunResult, TestCase, TestResult, TestStep},
    reporter::Reporter,
};
use camino::Utf8PathBuf;
use std::{collections::HashMap, io::BufRead, sync::Arc, time::Duration};
use testspan_metadata::{RunnerEventSummary, TestStepSummary};
use tracing::{debug, warn};

/// Counts of events seen by an [`EventReplayer`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Events forwarded to the reporter.
    pub dispatched: usize,

    /// Events dropped because they referred to an unknown execution.
    pub skipped: usize,
}

/// Forwards runner events to a reporter.
#[derive(Debug)]
pub struct EventReplayer<R> {
    reporter: R,
    root_dir: Option<Utf8PathBuf>,
    executions: HashMap<(String, u32), OpenExecution>,
    summary: ReplaySummary,
}

#[derive(Debug)]
struct OpenExecution {
    test: TestCase,
    result: TestResult,
    // Steps that have begun, by runner-assigned id.
    steps: HashMap<String, Arc<TestStep>>,
}

impl OpenExecution {
    fn to_step(&self, summary: TestStepSummary) -> TestStep {
        let parent = summary.parent_id.as_ref().and_then(|parent_id| {
            let parent = self.steps.get(parent_id).cloned();
            if parent.is_none() {
                warn!(
                    test_id = %self.test.id,
                    step = %summary.title,
                    %parent_id,
                    "step refers to a parent step that has not begun, treating it as top-level"
                );
            }
            parent
        });
        TestStep {
            title: summary.title,
            category: summary.category,
            start_time: summary.start_time,
            duration: Duration::from_millis(summary.duration_ms),
            location: summary.location.map(Into::into),
            error: summary.error.map(Into::into),
            parent,
        }
    }
}

impl<R: Reporter> EventReplayer<R> {
    /// Creates a new replayer forwarding to `reporter`.
    pub fn new(reporter: R) -> Self {
        Self {
            reporter,
            root_dir: None,
            executions: HashMap::new(),
            summary: ReplaySummary::default(),
        }
    }

    /// Replaces the root directory reported by the runner with `root_dir`.
    pub fn with_root_dir(mut self, root_dir: Option<Utf8PathBuf>) -> Self {
        self.root_dir = root_dir;
        self
    }

    /// Returns the reporter.
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Returns counts of the events seen so far.
    pub fn summary(&self) -> ReplaySummary {
        self.summary
    }

    /// Consumes the replayer, returning the reporter.
    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Forwards a single event.
    pub fn replay(&mut self, event: RunnerEventSummary) {
        match event {
            RunnerEventSummary::Begin { config } => {
                let mut config = RunConfig::from(config);
                if let Some(root_dir) = &self.root_dir {
                    debug!(
                        reported = %config.root_dir,
                        %root_dir,
                        "overriding root directory"
                    );
                    config.root_dir = root_dir.clone();
                }
                self.reporter.on_begin(&config);
            }
            RunnerEventSummary::TestBegin { test, result } => {
                let test = TestCase::from(test);
                let result = TestResult::from(result);
                self.reporter.on_test_begin(&test, &result);

                let key = (test.id.clone(), result.retry);
                let execution = OpenExecution {
                    test,
                    result,
                    steps: HashMap::new(),
                };
                if let Some(previous) = self.executions.insert(key, execution) {
                    warn!(
                        test_id = %previous.test.id,
                        retry = previous.result.retry,
                        "execution began twice without ending, forgetting its open steps"
                    );
                }
            }
            RunnerEventSummary::TestEnd { test, result } => {
                let test = TestCase::from(test);
                let result = TestResult::from(result);
                self.executions.remove(&(test.id.clone(), result.retry));
                self.reporter.on_test_end(&test, &result);
            }
            RunnerEventSummary::StepBegin {
                test_id,
                retry,
                step,
            } => {
                let Some(execution) = self.executions.get_mut(&(test_id, retry)) else {
                    self.skip_step(&step);
                    return;
                };
                let id = step.id.clone();
                let step = Arc::new(execution.to_step(step));
                self.reporter
                    .on_step_begin(&execution.test, &execution.result, &step);
                execution.steps.insert(id, step);
            }
            RunnerEventSummary::StepEnd {
                test_id,
                retry,
                step,
            } => {
                let Some(execution) = self.executions.get_mut(&(test_id, retry)) else {
                    self.skip_step(&step);
                    return;
                };
                let id = step.id.clone();
                let step = execution.to_step(step);
                self.reporter
                    .on_step_end(&execution.test, &execution.result, &step);
                execution.steps.remove(&id);
            }
            RunnerEventSummary::End { result } => {
                if !self.executions.is_empty() {
                    debug!(
                        open = self.executions.len(),
                        "run ended with executions that never ended"
                    );
                }
                self.reporter.on_end(&RunResult::from(result));
            }
        }
        self.summary.dispatched += 1;
    }

    fn skip_step(&mut self, step: &TestStepSummary) {
        warn!(
            step = %step.title,
            "step event for an execution that has not begun, skipping"
        );
        self.summary.skipped += 1;
    }
}

/// Reads JSON-lines runner events from `reader` and replays them.
///
/// Blank lines are skipped. `source_name` describes where the events come
/// from, for error messages.
pub fn replay_reader<R: Reporter>(
    replayer: &mut EventReplayer<R>,
    reader: impl BufRead,
    source_name: &str,
) -> Result<ReplaySummary, ReplayError> {
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|error| ReplayError::Read {
            source_name: source_name.to_owned(),
            error,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event: RunnerEventSummary =
            serde_json::from_str(&line).map_err(|error| ReplayError::Parse {
                source_name: source_name.to_owned(),
                line: idx + 1,
                error,
            })?;
        replayer.replay(event);
    }
    Ok(replayer.summary())
}
