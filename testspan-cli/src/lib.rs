// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record test runs as OpenTelemetry traces.
//!
//! `testspan replay` reads a test runner's lifecycle events as JSON lines
//! and exports one span per test execution and per step. See
//! [`testspan_metadata`] for the event format.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter};
