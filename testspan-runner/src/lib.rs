// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for testspan: records test runs as OpenTelemetry
//! traces.
//!
//! Each test execution becomes a span, and each step within it a child span.
//! The entry point is [`reporter::OtelReporter`], which implements the
//! [`reporter::Reporter`] lifecycle trait. Runners that cannot call into Rust
//! can write their events as JSON lines and have them replayed through
//! [`replay::EventReplayer`].
//!
//! ```
//! use opentelemetry::trace::TracerProvider as _;
//! use opentelemetry_sdk::trace::SdkTracerProvider;
//! use testspan_runner::{model::RunConfig, reporter::{OtelReporter, Reporter}};
//!
//! let provider = SdkTracerProvider::builder().build();
//! let mut reporter = OtelReporter::new(provider.tracer("example"));
//! reporter.on_begin(&RunConfig::new("/repo"));
//! assert!(!reporter.prints_to_stdio());
//! ```

pub mod annotations;
pub mod config;
pub mod errors;
pub mod identity;
pub mod model;
pub mod replay;
pub mod reporter;
pub mod telemetry;
pub mod title;
