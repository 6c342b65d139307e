// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable titles for tests and steps.
//!
//! A title looks like `[project] › tests/login.spec.ts:12:5 › suite › test`,
//! followed for steps by the titles of the step and all its ancestors, and by
//! any tags not already mentioned in the test title.

use crate::model::{RunConfig, TestCase, TestStep};
use camino::Utf8Path;
use swrite::{SWrite, swrite};

/// Separator between title segments.
pub const TITLE_SEPARATOR: &str = " › ";

/// Formats the title of a test, or of a step within the test.
///
/// If `omit_location` is true, the `:line:column` suffix of the file is left
/// out. The output only depends on the arguments.
pub fn format_title(
    config: &RunConfig,
    test: &TestCase,
    step: Option<&TestStep>,
    omit_location: bool,
) -> String {
    let relative = relative_file_path(config, &test.location.file);

    let mut title = String::new();
    if let Some(project) = test.project_name() {
        swrite!(title, "[{project}]{TITLE_SEPARATOR}");
    }
    if omit_location {
        title.push_str(relative);
    } else {
        swrite!(
            title,
            "{relative}:{}:{}",
            test.location.line,
            test.location.column
        );
    }
    title.push_str(TITLE_SEPARATOR);
    title.push_str(&test.titles().join(TITLE_SEPARATOR));

    // Tags are matched against the test part only, so a step mentioning a tag
    // does not suppress it.
    let extra_tags: Vec<&str> = test
        .tags
        .iter()
        .map(|tag| tag.as_str())
        .filter(|tag| !title.contains(tag))
        .collect();

    if let Some(step) = step {
        for step_title in step.title_path() {
            title.push_str(TITLE_SEPARATOR);
            title.push_str(first_line(step_title));
        }
    }
    for tag in extra_tags {
        swrite!(title, " {tag}");
    }

    title
}

/// Returns `file` relative to the run's root directory.
///
/// Falls back to the file name if `file` is outside the root, or if it is the
/// root itself.
pub fn relative_file_path<'a>(config: &RunConfig, file: &'a Utf8Path) -> &'a str {
    match file.strip_prefix(&config.root_dir) {
        Ok(relative) if !relative.as_str().is_empty() => relative.as_str(),
        _ => file.file_name().unwrap_or(file.as_str()),
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or_default()
}
