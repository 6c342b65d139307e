// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `testspan` failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum TestspanExitCode {}

impl TestspanExitCode {
    /// No errors occurred and testspan exited normally.
    pub const OK: i32 = 0;

    /// A user issue happened while setting up a testspan invocation, for
    /// example an invalid config file.
    pub const SETUP_ERROR: i32 = 96;

    /// The telemetry pipeline could not be initialized or shut down cleanly.
    pub const TELEMETRY_ERROR: i32 = 97;

    /// The runner event stream could not be read or contained malformed
    /// events.
    pub const EVENT_STREAM_ERROR: i32 = 98;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
