// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporters receive test run lifecycle events.
//!
//! The main type here is [`OtelReporter`], which turns tests and steps into
//! OpenTelemetry spans.

mod attributes;
mod otel;

pub use attributes::*;
pub use otel::*;

use crate::model::{RunConfig, RunResult, TestCase, TestResult, TestStep};

/// Receives lifecycle events from a test runner.
///
/// Events arrive in the order `on_begin`, then for each test execution
/// `on_test_begin`, any number of nested `on_step_begin`/`on_step_end` pairs,
/// and `on_test_end`, and finally `on_end`. Events for different executions
/// may interleave.
///
/// All methods default to doing nothing.
pub trait Reporter {
    /// Called once before any test runs.
    fn on_begin(&mut self, _config: &RunConfig) {}

    /// Called when an execution of `test` starts.
    fn on_test_begin(&mut self, _test: &TestCase, _result: &TestResult) {}

    /// Called when an execution of `test` finishes. `result` is complete.
    fn on_test_end(&mut self, _test: &TestCase, _result: &TestResult) {}

    /// Called when a step starts within an execution of `test`.
    fn on_step_begin(&mut self, _test: &TestCase, _result: &TestResult, _step: &TestStep) {}

    /// Called when a step finishes. `step` carries its duration and error.
    fn on_step_end(&mut self, _test: &TestCase, _result: &TestResult, _step: &TestStep) {}

    /// Called once after all tests have finished.
    fn on_end(&mut self, _result: &RunResult) {}

    /// Returns true if this reporter writes to stdout or stderr.
    ///
    /// Runners use this to decide whether to add a console reporter of their
    /// own.
    fn prints_to_stdio(&self) -> bool {
        true
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn on_begin(&mut self, config: &RunConfig) {
        (**self).on_begin(config)
    }

    fn on_test_begin(&mut self, test: &TestCase, result: &TestResult) {
        (**self).on_test_begin(test, result)
    }

    fn on_test_end(&mut self, test: &TestCase, result: &TestResult) {
        (**self).on_test_end(test, result)
    }

    fn on_step_begin(&mut self, test: &TestCase, result: &TestResult, step: &TestStep) {
        (**self).on_step_begin(test, result, step)
    }

    fn on_step_end(&mut self, test: &TestCase, result: &TestResult, step: &TestStep) {
        (**self).on_step_end(test, result, step)
    }

    fn on_end(&mut self, result: &RunResult) {
        (**self).on_end(result)
    }

    fn prints_to_stdio(&self) -> bool {
        (**self).prints_to_stdio()
    }
}
