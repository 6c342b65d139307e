// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Machine-readable event stream consumed by `testspan`.
//!
//! A test runner that is not written in Rust can describe its lifecycle as a
//! stream of JSON lines, one [`RunnerEventSummary`] per line. `testspan replay`
//! feeds that stream into the OpenTelemetry reporter.
//!
//! ```json
//! {"type":"begin","config":{"root-dir":"/repo"}}
//! {"type":"test-begin","test":{...},"result":{...}}
//! {"type":"step-begin","test-id":"t1","retry":0,"step":{...}}
//! ```

mod events;
mod exit_codes;

pub use events::*;
pub use exit_codes::*;
