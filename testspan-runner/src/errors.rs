// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testspan.

use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use opentelemetry_otlp::ExporterBuildError;
use opentelemetry_sdk::error::OTelSdkError;
use thiserror::Error;

/// An error that occurred while parsing the testspan config.
#[derive(Debug, Error)]
#[error("failed to parse testspan config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of config parse error that occurred.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the layered config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// A value in the config was out of range.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue {
        /// The config key.
        key: &'static str,

        /// Why the value was rejected.
        reason: String,
    },
}

/// An error that occurred while setting up the telemetry pipeline.
#[derive(Debug, Error)]
#[error("failed to initialize span exporter for service `{service_name}`")]
pub struct TelemetryInitError {
    service_name: String,
    #[source]
    err: ExporterBuildError,
}

impl TelemetryInitError {
    pub(crate) fn new(service_name: impl Into<String>, err: ExporterBuildError) -> Self {
        Self {
            service_name: service_name.into(),
            err,
        }
    }
}

/// An error that occurred while flushing and shutting down the telemetry
/// pipeline.
#[derive(Debug, Error)]
#[error("failed to flush and shut down the tracer provider")]
pub struct TelemetryShutdownError {
    #[source]
    err: OTelSdkError,
}

impl TelemetryShutdownError {
    pub(crate) fn new(err: OTelSdkError) -> Self {
        Self { err }
    }
}

/// An error that occurred while replaying a runner event stream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReplayError {
    /// Reading from the event stream failed.
    #[error("failed to read runner events from {source_name}")]
    Read {
        /// A description of where events were read from.
        source_name: String,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A line of the event stream was not a valid event.
    #[error("failed to parse runner event at line {line} of {source_name}")]
    Parse {
        /// A description of where events were read from.
        source_name: String,

        /// The 1-based line number.
        line: usize,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}
