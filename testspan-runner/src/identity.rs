// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    model::{RunConfig, TestCase, TestStep},
    title::format_title,
};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifies an open step within one test execution.
///
/// The key is the lowercase hex SHA-256 digest of the step's full title, so
/// steps with the same title path under the same test share a key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepKey(String);

impl StepKey {
    /// Returns the key as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the key for `step` within `test`.
pub fn step_key(test: &TestCase, step: &TestStep, config: &RunConfig) -> StepKey {
    let title = format_title(config, test, Some(step), false);
    StepKey(hex::encode(Sha256::digest(title.as_bytes())))
}
