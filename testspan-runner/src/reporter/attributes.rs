// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Span attributes recorded for tests and steps.

use crate::{
    annotations::annotation_attributes,
    model::{RunConfig, TestCase, TestResult, TestStep},
    title::{TITLE_SEPARATOR, format_title, relative_file_path},
};
use opentelemetry::{Key, KeyValue, Value};
use std::borrow::Cow;

/// Attribute keys.
///
/// Keys defined by the OpenTelemetry semantic conventions are re-exported from
/// there; the rest are specific to testspan.
pub mod keys {
    pub use opentelemetry_semantic_conventions::attribute::{
        CODE_COLUMN_NUMBER, CODE_FILE_PATH, CODE_LINE_NUMBER, TEST_CASE_NAME,
        TEST_CASE_RESULT_STATUS, TEST_SUITE_NAME,
    };

    /// The runner-assigned test id.
    pub const TEST_ID: &str = "test.id";
    /// The status the execution finished with.
    pub const TEST_STATUS: &str = "test.status";
    /// The status the test was expected to finish with.
    pub const TEST_EXPECTED_STATUS: &str = "test.expected_status";
    /// See [`TestOutcome`](crate::model::TestOutcome).
    pub const TEST_OUTCOME: &str = "test.outcome";
    /// 0 for the first attempt.
    pub const TEST_RETRY: &str = "test.retry";
    /// The worker the execution ran on.
    pub const TEST_WORKER_INDEX: &str = "test.worker_index";
    /// The project name, when the test belongs to one.
    pub const TEST_PROJECT: &str = "test.project";
    /// Space-separated tags.
    pub const TEST_TAGS: &str = "test.tags";
    /// The full step title.
    pub const TEST_STEP_TITLE: &str = "test.step.title";
    /// The step category reported by the runner.
    pub const TEST_STEP_CATEGORY: &str = "test.step.category";
}

/// The value of a [`SpanAttribute`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeValue {
    /// A string.
    String(String),

    /// A signed integer.
    Int(i64),

    /// A boolean.
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<AttributeValue> for Value {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::String(s) => Value::from(s),
            AttributeValue::Int(i) => Value::I64(i),
            AttributeValue::Bool(b) => Value::Bool(b),
        }
    }
}

/// A typed key/value pair recorded on a span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpanAttribute {
    /// The attribute key.
    pub key: Cow<'static, str>,

    /// The attribute value.
    pub value: AttributeValue,
}

impl SpanAttribute {
    /// Creates a new attribute.
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl From<SpanAttribute> for KeyValue {
    fn from(attribute: SpanAttribute) -> Self {
        let key = match attribute.key {
            Cow::Borrowed(key) => Key::from_static_str(key),
            Cow::Owned(key) => Key::from(key),
        };
        KeyValue::new(key, attribute.value)
    }
}

/// Attributes recorded on a test span when the test ends, in a fixed order.
pub fn test_attributes(
    config: &RunConfig,
    test: &TestCase,
    result: &TestResult,
) -> Vec<SpanAttribute> {
    let relative = relative_file_path(config, &test.location.file);
    let describes = test.describe_titles();
    let suite_name = if describes.is_empty() {
        relative.to_owned()
    } else {
        describes.join(TITLE_SEPARATOR)
    };
    let passing = result.is_passing(test.expected_status);

    let mut attributes = vec![
        SpanAttribute::new(
            keys::TEST_CASE_NAME,
            format_title(config, test, None, true),
        ),
        SpanAttribute::new(keys::TEST_SUITE_NAME, suite_name),
        SpanAttribute::new(
            keys::TEST_CASE_RESULT_STATUS,
            if passing { "pass" } else { "fail" },
        ),
        SpanAttribute::new(keys::TEST_ID, test.id.as_str()),
        SpanAttribute::new(keys::TEST_STATUS, result.status.as_str()),
        SpanAttribute::new(keys::TEST_EXPECTED_STATUS, test.expected_status.as_str()),
        SpanAttribute::new(
            keys::TEST_OUTCOME,
            result.outcome(test.expected_status).as_str(),
        ),
        SpanAttribute::new(keys::TEST_RETRY, result.retry),
        SpanAttribute::new(keys::TEST_WORKER_INDEX, result.worker_index),
        SpanAttribute::new(keys::CODE_FILE_PATH, relative),
        SpanAttribute::new(keys::CODE_LINE_NUMBER, test.location.line),
        SpanAttribute::new(keys::CODE_COLUMN_NUMBER, test.location.column),
    ];
    if let Some(project) = test.project_name() {
        attributes.push(SpanAttribute::new(keys::TEST_PROJECT, project));
    }
    if !test.tags.is_empty() {
        attributes.push(SpanAttribute::new(keys::TEST_TAGS, test.tags.join(" ")));
    }
    attributes.extend(annotation_attributes(&test.annotations));
    attributes
}

/// Attributes recorded on a step span when the step ends.
pub fn step_attributes(config: &RunConfig, step: &TestStep) -> Vec<SpanAttribute> {
    let mut attributes = vec![
        SpanAttribute::new(keys::TEST_STEP_CATEGORY, step.category.as_str()),
        SpanAttribute::new(keys::TEST_STEP_TITLE, step.title.as_str()),
    ];
    if let Some(location) = &step.location {
        attributes.extend([
            SpanAttribute::new(
                keys::CODE_FILE_PATH,
                relative_file_path(config, &location.file),
            ),
            SpanAttribute::new(keys::CODE_LINE_NUMBER, location.line),
            SpanAttribute::new(keys::CODE_COLUMN_NUMBER, location.column),
        ]);
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        annotations::annotation_label,
        model::{Annotation, Location, TestStatus},
    };
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn example_test() -> TestCase {
        TestCase {
            id: "t1".to_owned(),
            title: "pays".to_owned(),
            title_path: ["", "webkit", "tests/checkout.spec.ts", "checkout", "pays"]
                .map(String::from)
                .to_vec(),
            location: Location::new("/repo/tests/checkout.spec.ts", 10, 3),
            tags: vec!["@smoke".to_owned()],
            annotations: vec![
                Annotation::new(annotation_label("team"), Some("payments".to_owned())),
                Annotation::new("issue", Some("https://example.com/1".to_owned())),
            ],
            expected_status: TestStatus::Passed,
        }
    }

    fn example_result(status: TestStatus, retry: u32) -> TestResult {
        TestResult {
            retry,
            worker_index: 2,
            start_time: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .expect("valid timestamp"),
            duration: Duration::from_millis(1200),
            status,
            error: None,
        }
    }

    #[test]
    fn test_attributes_in_order() {
        let attributes = test_attributes(
            &RunConfig::new("/repo"),
            &example_test(),
            &example_result(TestStatus::Passed, 1),
        );

        assert_eq!(
            attributes,
            vec![
                SpanAttribute::new(
                    "test.case.name",
                    "[webkit] › tests/checkout.spec.ts › checkout › pays @smoke"
                ),
                SpanAttribute::new("test.suite.name", "checkout"),
                SpanAttribute::new("test.case.result.status", "pass"),
                SpanAttribute::new("test.id", "t1"),
                SpanAttribute::new("test.status", "passed"),
                SpanAttribute::new("test.expected_status", "passed"),
                SpanAttribute::new("test.outcome", "flaky"),
                SpanAttribute::new("test.retry", 1u32),
                SpanAttribute::new("test.worker_index", 2u32),
                SpanAttribute::new("code.file.path", "tests/checkout.spec.ts"),
                SpanAttribute::new("code.line.number", 10u32),
                SpanAttribute::new("code.column.number", 3u32),
                SpanAttribute::new("test.project", "webkit"),
                SpanAttribute::new("test.tags", "@smoke"),
                SpanAttribute::new("team", "payments"),
            ],
        );
    }

    #[test]
    fn failing_result_status() {
        let attributes = test_attributes(
            &RunConfig::new("/repo"),
            &example_test(),
            &example_result(TestStatus::TimedOut, 0),
        );
        let status = attributes
            .iter()
            .find(|attribute| attribute.key == "test.case.result.status")
            .expect("result status is recorded");
        assert_eq!(status.value, AttributeValue::from("fail"));
    }

    #[test]
    fn suite_name_falls_back_to_file() {
        let mut test = example_test();
        test.title_path = ["", "", "tests/checkout.spec.ts", "pays"]
            .map(String::from)
            .to_vec();
        let attributes = test_attributes(
            &RunConfig::new("/repo"),
            &test,
            &example_result(TestStatus::Passed, 0),
        );
        assert_eq!(
            attributes[1],
            SpanAttribute::new("test.suite.name", "tests/checkout.spec.ts")
        );
        assert!(
            !attributes
                .iter()
                .any(|attribute| attribute.key == "test.project")
        );
    }

    #[test]
    fn step_attributes_with_location() {
        let start = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").expect("valid timestamp");
        let mut step = TestStep::new("click pay", "pw:api", start);
        step.location = Some(Location::new("/repo/tests/helpers.ts", 4, 7));

        assert_eq!(
            step_attributes(&RunConfig::new("/repo"), &step),
            vec![
                SpanAttribute::new("test.step.category", "pw:api"),
                SpanAttribute::new("test.step.title", "click pay"),
                SpanAttribute::new("code.file.path", "tests/helpers.ts"),
                SpanAttribute::new("code.line.number", 4u32),
                SpanAttribute::new("code.column.number", 7u32),
            ],
        );
    }

    #[test]
    fn converts_to_key_value() {
        let kv = KeyValue::from(SpanAttribute::new("test.retry", 3u32));
        assert_eq!(kv.key.as_str(), "test.retry");
        assert_eq!(kv.value, Value::I64(3));

        let kv = KeyValue::from(SpanAttribute::new(String::from("team"), "payments"));
        assert_eq!(kv.key.as_str(), "team");
        assert_eq!(kv.value.as_str(), "payments");
    }
}
