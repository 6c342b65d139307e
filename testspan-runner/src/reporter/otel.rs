// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Reporter, step_attributes, test_attributes};
use crate::{
    identity::{StepKey, step_key},
    model::{RunConfig, RunResult, TestCase, TestResult, TestStep},
    title::format_title,
};
use opentelemetry::{
    Context, KeyValue,
    trace::{SpanKind, Status, TraceContextExt, Tracer},
};
use std::{collections::HashMap, fmt, time::SystemTime};
use tracing::{debug, info, warn};

/// Prefix of step span names.
pub const STEP_SPAN_PREFIX: &str = "Step: ";

/// A reporter that records each test execution and each step as a span.
///
/// Test spans are children of the ambient context when the test begins. Step
/// spans are children of their enclosing step's span, or of the test span for
/// top-level steps. Spans are started and ended with the timestamps reported
/// by the runner, not the time the events arrive.
///
/// Steps with the same title can be open at the same time within one
/// execution, for example when a test awaits several identical actions
/// concurrently. Each one gets its own span.
pub struct OtelReporter<T> {
    tracer: T,
    config: RunConfig,
    test_spans: HashMap<ExecutionKey, Context>,
    step_spans: HashMap<ExecutionKey, HashMap<StepKey, Vec<OpenStep>>>,
}

impl<T> OtelReporter<T>
where
    T: Tracer,
    T::Span: Send + Sync + 'static,
{
    /// Creates a new reporter that starts spans with `tracer`.
    pub fn new(tracer: T) -> Self {
        Self {
            tracer,
            config: RunConfig::default(),
            test_spans: HashMap::new(),
            step_spans: HashMap::new(),
        }
    }

    /// Returns the run configuration recorded by [`Reporter::on_begin`].
    pub fn run_config(&self) -> &RunConfig {
        &self.config
    }

    /// Returns the number of test spans that have begun but not ended.
    pub fn open_test_spans(&self) -> usize {
        self.test_spans.len()
    }

    /// Returns the number of step spans that have begun but not ended.
    pub fn open_step_spans(&self) -> usize {
        self.step_spans
            .values()
            .flat_map(|table| table.values())
            .map(Vec::len)
            .sum()
    }

    fn resolve_parent(
        &self,
        test: &TestCase,
        execution: &ExecutionKey,
        step: &TestStep,
    ) -> ParentSpan {
        match &step.parent {
            None => match self.test_spans.get(execution) {
                Some(cx) => ParentSpan::Test(cx.clone()),
                None => ParentSpan::Unresolved,
            },
            Some(parent) => {
                let parent_key = step_key(test, parent, &self.config);
                let open = self
                    .step_spans
                    .get(execution)
                    .and_then(|table| table.get(&parent_key))
                    .and_then(|open| {
                        let start_time = parent.start_system_time();
                        open.iter()
                            .rev()
                            .find(|open| open.start_time == start_time)
                            .or_else(|| open.last())
                    });
                match open {
                    Some(open) => ParentSpan::Step(open.cx.clone()),
                    None => ParentSpan::Unresolved,
                }
            }
        }
    }

    fn end_orphaned_steps(&mut self, execution: &ExecutionKey, end_time: SystemTime) {
        let Some(table) = self.step_spans.remove(execution) else {
            return;
        };
        let open: Vec<_> = table.into_values().flatten().collect();
        if open.is_empty() {
            return;
        }
        warn!(
            test_id = %execution.test_id,
            retry = execution.retry,
            count = open.len(),
            "test ended with steps still open, ending them with the test"
        );
        for open in open {
            let span = open.cx.span();
            span.set_status(Status::error("step did not end before its test"));
            span.end_with_timestamp(end_time);
        }
    }
}

impl<T> Reporter for OtelReporter<T>
where
    T: Tracer,
    T::Span: Send + Sync + 'static,
{
    fn on_begin(&mut self, config: &RunConfig) {
        info!(
            root_dir = %config.root_dir,
            shard = config.shard.map(|shard| shard.to_string()),
            workers = config.workers,
            version = config.version.as_deref(),
            "test run started"
        );
        self.config = config.clone();
    }

    fn on_test_begin(&mut self, test: &TestCase, result: &TestResult) {
        let name = format_title(&self.config, test, None, false);
        let start_time = result.start_system_time();
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(SpanKind::Internal)
            .with_start_time(start_time)
            .start_with_context(&self.tracer, &Context::current());
        let cx = Context::current().with_span(span);

        if let Some(previous) = self.test_spans.insert(ExecutionKey::new(test, result), cx) {
            // How the earlier attempt ended is unknown: leave its status unset.
            warn!(
                test_id = %test.id,
                retry = result.retry,
                "execution began again before it ended, closing the earlier span"
            );
            previous.span().end_with_timestamp(start_time);
        }
    }

    fn on_test_end(&mut self, test: &TestCase, result: &TestResult) {
        let execution = ExecutionKey::new(test, result);
        let Some(cx) = self.test_spans.remove(&execution) else {
            debug!(test_id = %test.id, retry = result.retry, "no open span for ended test");
            return;
        };
        let end_time = result.end_system_time();
        self.end_orphaned_steps(&execution, end_time);

        let span = cx.span();
        span.set_attributes(
            test_attributes(&self.config, test, result)
                .into_iter()
                .map(KeyValue::from),
        );
        if !result.is_passing(test.expected_status) {
            let message = result
                .error
                .as_ref()
                .map(|error| error.message_or_empty().to_owned())
                .unwrap_or_default();
            span.set_status(Status::error(message));
        }
        span.end_with_timestamp(end_time);
    }

    fn on_step_begin(&mut self, test: &TestCase, result: &TestResult, step: &TestStep) {
        let execution = ExecutionKey::new(test, result);
        let parent = self.resolve_parent(test, &execution, step);
        if matches!(parent, ParentSpan::Unresolved) {
            debug!(
                test_id = %test.id,
                retry = result.retry,
                step = %step.title,
                "no open parent span for step, using the ambient context"
            );
        }
        let key = step_key(test, step, &self.config);

        let parent_cx = parent.into_context();
        let start_time = step.start_system_time();
        let span = self
            .tracer
            .span_builder(format!("{STEP_SPAN_PREFIX}{}", step.title))
            .with_kind(SpanKind::Internal)
            .with_start_time(start_time)
            .start_with_context(&self.tracer, &parent_cx);
        let cx = parent_cx.with_span(span);

        let open = self
            .step_spans
            .entry(execution)
            .or_default()
            .entry(key)
            .or_default();
        if !open.is_empty() {
            debug!(
                test_id = %test.id,
                retry = result.retry,
                step = %step.title,
                open = open.len(),
                "step began while steps with the same title are open"
            );
        }
        open.push(OpenStep { start_time, cx });
    }

    fn on_step_end(&mut self, test: &TestCase, result: &TestResult, step: &TestStep) {
        let execution = ExecutionKey::new(test, result);
        let key = step_key(test, step, &self.config);
        let Some(table) = self.step_spans.get_mut(&execution) else {
            debug!(test_id = %test.id, step = %step.title, "no open span for ended step");
            return;
        };
        let Some(open) = table.get_mut(&key) else {
            debug!(test_id = %test.id, step = %step.title, "no open span for ended step");
            return;
        };
        // Prefer the span that began at this step's start time. Otherwise the
        // most recently begun one ends.
        let start_time = step.start_system_time();
        let Some(idx) = open
            .iter()
            .rposition(|open| open.start_time == start_time)
            .or_else(|| open.len().checked_sub(1))
        else {
            debug!(test_id = %test.id, step = %step.title, "no open span for ended step");
            return;
        };
        let OpenStep { cx, .. } = open.remove(idx);
        if open.is_empty() {
            table.remove(&key);
        }
        if table.is_empty() {
            self.step_spans.remove(&execution);
        }

        let span = cx.span();
        span.set_attributes(
            step_attributes(&self.config, step)
                .into_iter()
                .map(KeyValue::from),
        );
        if let Some(error) = &step.error {
            span.set_status(Status::error(error.message_or_empty().to_owned()));
        }
        span.end_with_timestamp(step.end_system_time());
    }

    fn on_end(&mut self, result: &RunResult) {
        let open_tests = self.open_test_spans();
        let open_steps = self.open_step_spans();
        if open_tests > 0 || open_steps > 0 {
            warn!(
                open_tests,
                open_steps, "test run ended with spans that were never ended"
            );
        }
        info!(
            status = %result.status,
            duration_ms = result.duration.as_millis() as u64,
            "test run finished"
        );
    }

    fn prints_to_stdio(&self) -> bool {
        false
    }
}

impl<T> fmt::Debug for OtelReporter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtelReporter")
            .field("config", &self.config)
            .field("open_tests", &self.test_spans.len())
            .field("open_step_tables", &self.step_spans.len())
            .finish_non_exhaustive()
    }
}

/// One execution of a test.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ExecutionKey {
    test_id: String,
    retry: u32,
}

impl ExecutionKey {
    fn new(test: &TestCase, result: &TestResult) -> Self {
        Self {
            test_id: test.id.clone(),
            retry: result.retry,
        }
    }
}

/// A step span that has begun but not ended.
#[derive(Debug)]
struct OpenStep {
    start_time: SystemTime,
    cx: Context,
}

/// The span a new step span is attached to.
#[derive(Debug)]
enum ParentSpan {
    /// The step is top-level and its test's span is open.
    Test(Context),

    /// The enclosing step's span is open.
    Step(Context),

    /// Neither could be found.
    Unresolved,
}

impl ParentSpan {
    fn into_context(self) -> Context {
        match self {
            Self::Test(cx) | Self::Step(cx) => cx,
            Self::Unresolved => Context::current(),
        }
    }
}
