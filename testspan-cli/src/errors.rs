// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use testspan_metadata::TestspanExitCode;
use testspan_runner::errors::{
    ConfigParseError, ReplayError, TelemetryInitError, TelemetryShutdownError,
};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are mostly placeholders. Errors are meant to be
// printed with display_to_stderr, which colorizes them.

/// An error that testspan expects can happen, with its own exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("current directory is invalid")]
    CurrentDirInvalid {
        #[source]
        err: std::io::Error,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("telemetry init error")]
    TelemetryInitError {
        #[from]
        err: TelemetryInitError,
    },
    #[error("telemetry shutdown error")]
    TelemetryShutdownError {
        #[from]
        err: TelemetryShutdownError,
    },
    #[error("failed to open events file")]
    EventsOpenFailed {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("replay error")]
    ReplayError {
        #[from]
        err: ReplayError,
    },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn events_open_failed(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::EventsOpenFailed {
            path: path.into(),
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirInvalid { .. } | Self::ConfigParseError { .. } => {
                TestspanExitCode::SETUP_ERROR
            }
            Self::TelemetryInitError { .. } | Self::TelemetryShutdownError { .. } => {
                TestspanExitCode::TELEMETRY_ERROR
            }
            Self::EventsOpenFailed { .. } | Self::ReplayError { .. } => {
                TestspanExitCode::EVENT_STREAM_ERROR
            }
            Self::WriteOutputError { .. } => TestspanExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirInvalid { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse testspan config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::TelemetryInitError { err } => {
                error!("{err}");
                err.source()
            }
            Self::TelemetryShutdownError { err } => {
                error!("{err}");
                err.source()
            }
            Self::EventsOpenFailed { path, err } => {
                error!("failed to open events file `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::ReplayError { err } => {
                error!("{err}");
                err.source()
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
