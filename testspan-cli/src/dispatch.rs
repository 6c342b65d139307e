// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter, StdoutStyles, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use std::{
    fs::File,
    io::{BufReader, Write},
};
use testspan_metadata::TestspanExitCode;
use testspan_runner::{
    annotations::annotation_label,
    config::TestspanConfig,
    replay::{EventReplayer, replay_reader},
    reporter::OtelReporter,
    telemetry::TelemetryHandle,
};
use tracing::{debug, info, warn};

/// Record test runs as OpenTelemetry traces.
///
/// testspan reads the lifecycle events of a test run and exports one span per
/// test execution, with a child span per test step.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct TestspanApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(subcommand)]
    command: Command,
}

impl TestspanApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Replay(opts) => opts.exec(&self.config_opts),
            Command::AnnotationLabel { name } => {
                let mut writer = output_writer.stdout_writer();
                writeln!(writer, "{}", annotation_label(&name))
                    .and_then(|()| writer.flush())
                    .map_err(|err| ExpectedError::WriteOutputError { err })?;
                Ok(TestspanExitCode::OK)
            }
            Command::ShowConfig => {
                let cwd = current_dir()?;
                let config = self.config_opts.make_config(&cwd)?;
                let config_file = self.config_opts.config_file(&cwd);
                let mut writer = output_writer.stdout_writer();
                write_config(&config, &config_file, &output.stdout_styles(), &mut writer)
                    .and_then(|()| writer.flush())
                    .map_err(|err| ExpectedError::WriteOutputError { err })?;
                Ok(TestspanExitCode::OK)
            }
        }
    }
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: .config/testspan.toml in the current directory]
    #[arg(long, global = true, value_name = "PATH", env = "TESTSPAN_CONFIG_FILE")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self, base_dir: &Utf8Path) -> Result<TestspanConfig> {
        Ok(TestspanConfig::from_sources(
            base_dir,
            self.config_file.as_deref(),
        )?)
    }

    fn config_file(&self, base_dir: &Utf8Path) -> Utf8PathBuf {
        match &self.config_file {
            Some(file) => file.clone(),
            None => base_dir.join(TestspanConfig::CONFIG_PATH),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a recorded event stream as spans
    ///
    /// Events are read as JSON lines, one runner event per line. Spans are
    /// flushed to the configured exporter before the command exits.
    Replay(ReplayOpts),

    /// Print the annotation type that becomes a span attribute
    ///
    /// Test annotations whose type starts with `otel:` are recorded on the
    /// test's span, keyed by the rest of the type.
    AnnotationLabel {
        /// Attribute name
        name: String,
    },

    /// Show the effective configuration
    ShowConfig,
}

#[derive(Debug, Args)]
struct ReplayOpts {
    /// Event stream to read, or `-` for standard input
    #[arg(long, short = 'e', value_name = "PATH", default_value = "-")]
    events: Utf8PathBuf,

    /// Directory test file paths are made relative to [default: the runner's
    /// root directory]
    #[arg(long, value_name = "DIR")]
    root_dir: Option<Utf8PathBuf>,
}

impl ReplayOpts {
    fn exec(self, config_opts: &ConfigOpts) -> Result<i32> {
        let cwd = current_dir()?;
        let config = config_opts.make_config(&cwd)?;
        let root_dir = self
            .root_dir
            .or(config.run.root_dir)
            .map(|root_dir| cwd.join(root_dir));

        let telemetry = TelemetryHandle::init(&config.telemetry)?;
        debug!(
            service_name = %config.telemetry.service_name,
            exporter = %config.telemetry.exporter,
            "telemetry initialized"
        );

        let mut replayer =
            EventReplayer::new(OtelReporter::new(telemetry.tracer())).with_root_dir(root_dir);
        let result = if self.events == "-" {
            replay_reader(&mut replayer, std::io::stdin().lock(), "standard input")
        } else {
            match File::open(&self.events) {
                Ok(file) => {
                    replay_reader(&mut replayer, BufReader::new(file), self.events.as_str())
                }
                Err(err) => {
                    shutdown_quietly(telemetry);
                    return Err(ExpectedError::events_open_failed(self.events, err));
                }
            }
        };

        let open_tests = replayer.reporter().open_test_spans();

        // Spans that did end are flushed even if the stream was malformed.
        let summary = match result {
            Ok(summary) => summary,
            Err(err) => {
                shutdown_quietly(telemetry);
                return Err(err.into());
            }
        };
        telemetry.shutdown()?;

        if open_tests > 0 {
            warn!("{open_tests} test spans were never ended and were not exported");
        }
        info!(
            "replayed {} events ({} skipped)",
            summary.dispatched, summary.skipped
        );
        Ok(TestspanExitCode::OK)
    }
}

fn shutdown_quietly(telemetry: TelemetryHandle) {
    if let Err(err) = telemetry.shutdown() {
        warn!("{err}");
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(|err| ExpectedError::CurrentDirInvalid { err })?;
    Utf8PathBuf::try_from(cwd).map_err(|err| ExpectedError::CurrentDirInvalid {
        err: err.into_io_error(),
    })
}

fn write_config(
    config: &TestspanConfig,
    config_file: &Utf8Path,
    styles: &StdoutStyles,
    writer: &mut impl Write,
) -> std::io::Result<()> {
    fn value_or_unset(value: Option<&str>, styles: &StdoutStyles) -> String {
        match value {
            Some(value) => value.to_owned(),
            None => "(unset)".style(styles.unset).to_string(),
        }
    }

    let telemetry = &config.telemetry;
    writeln!(writer, "{}", "telemetry".style(styles.heading))?;
    writeln!(
        writer,
        "  {}: {}",
        "service-name".style(styles.key),
        telemetry.service_name
    )?;
    writeln!(
        writer,
        "  {}: {}",
        "service-version".style(styles.key),
        value_or_unset(telemetry.service_version.as_deref(), styles)
    )?;
    writeln!(
        writer,
        "  {}: {}",
        "exporter".style(styles.key),
        telemetry.exporter
    )?;
    writeln!(
        writer,
        "  {}: {}",
        "endpoint".style(styles.key),
        value_or_unset(telemetry.endpoint.as_deref(), styles)
    )?;
    writeln!(
        writer,
        "  {}: {}",
        "export-timeout".style(styles.key),
        humantime::format_duration(telemetry.export_timeout)
    )?;
    writeln!(writer, "{}", "run".style(styles.heading))?;
    writeln!(
        writer,
        "  {}: {}",
        "root-dir".style(styles.key),
        value_or_unset(config.run.root_dir.as_ref().map(|dir| dir.as_str()), styles)
    )?;
    writeln!(writer)?;
    writeln!(writer, "config file: {config_file}")
}
