// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for testspan itself.
//!
//! The main structure in this module is [`TestspanConfig`], read from an
//! embedded default layered under `.config/testspan.toml`.

use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, fmt, time::Duration};
use tracing::warn;

/// Trait for handling non-fatal issues found while reading the config.
pub trait ConfigWarnings {
    /// Handle unknown keys found in a config file.
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        base_dir: &Utf8Path,
        unknown: &BTreeSet<String>,
    );
}

/// Reports config warnings through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        base_dir: &Utf8Path,
        unknown: &BTreeSet<String>,
    ) {
        let mut unknown_str = String::new();
        if let (1, Some(key)) = (unknown.len(), unknown.first()) {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.push_str(key);
        } else {
            unknown_str.push_str("keys:\n");
            for key in unknown {
                unknown_str.push_str("\n  - ");
                unknown_str.push_str(key);
            }
        }

        warn!(
            "in config file {}, ignoring unknown configuration {unknown_str}",
            config_file.strip_prefix(base_dir).unwrap_or(config_file),
        );
    }
}

/// testspan's configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TestspanConfig {
    /// Telemetry pipeline settings.
    pub telemetry: TelemetryConfig,

    /// Settings applied to every replayed run.
    #[serde(default)]
    pub run: RunOverrides,
}

impl TestspanConfig {
    /// The default location of the config within a directory.
    pub const CONFIG_PATH: &'static str = ".config/testspan.toml";

    /// Contains the default config as a TOML file.
    ///
    /// User configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from `config_file`, or if not specified from
    /// `.config/testspan.toml` in `base_dir`.
    ///
    /// A missing `.config/testspan.toml` is not an error: the default config
    /// is used as is. Unknown keys are reported through tracing.
    pub fn from_sources(
        base_dir: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_warnings(base_dir, config_file, &mut DefaultConfigWarnings)
    }

    /// Reads the config with custom warning handling.
    pub fn from_sources_with_warnings(
        base_dir: &Utf8Path,
        config_file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = base_dir.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        if !unknown.is_empty() {
            warnings.unknown_config_keys(&config_file, base_dir, &unknown);
        }

        config
            .validate()
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        Ok(config)
    }

    /// Returns the default config.
    pub fn default_config() -> Self {
        let (config, _unknown) = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");
        config
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(Self, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: Self = serde_path_to_error::deserialize(ignored_de).map_err(|error| {
            // The config crate also reports the key: drop it so the path is
            // only printed once.
            let path = error.path().clone();
            let error = match error.into_inner() {
                ConfigError::At { error, .. } => *error,
                other => other,
            };
            ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                path, error,
            )))
        })?;

        Ok((config, ignored))
    }

    fn validate(&self) -> Result<(), ConfigParseErrorKind> {
        if self.telemetry.service_name.trim().is_empty() {
            return Err(ConfigParseErrorKind::InvalidValue {
                key: "telemetry.service-name",
                reason: "must not be empty".to_owned(),
            });
        }
        if self.telemetry.export_timeout.is_zero() {
            return Err(ConfigParseErrorKind::InvalidValue {
                key: "telemetry.export-timeout",
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }
}

/// Settings for the telemetry pipeline.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TelemetryConfig {
    /// The `service.name` resource attribute.
    pub service_name: String,

    /// The `service.version` resource attribute.
    #[serde(default)]
    pub service_version: Option<String>,

    /// Where spans are sent.
    pub exporter: ExporterKind,

    /// The OTLP/HTTP traces endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Timeout for a single export.
    #[serde(with = "humantime_serde")]
    pub export_timeout: Duration,
}

/// Where spans are sent.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExporterKind {
    /// Export over OTLP/HTTP with a batch span processor.
    Otlp,

    /// Drop spans.
    None,
}

impl fmt::Display for ExporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Otlp => write!(f, "otlp"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Settings applied to every replayed run.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RunOverrides {
    /// Overrides the root directory reported by the runner.
    #[serde(default)]
    pub root_dir: Option<Utf8PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::{Utf8TempDir, tempdir};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[derive(Default)]
    struct CollectWarnings {
        unknown: Vec<BTreeSet<String>>,
    }

    impl ConfigWarnings for CollectWarnings {
        fn unknown_config_keys(
            &mut self,
            _config_file: &Utf8Path,
            _base_dir: &Utf8Path,
            unknown: &BTreeSet<String>,
        ) {
            self.unknown.push(unknown.clone());
        }
    }

    fn temp_dir_with_config(contents: &str) -> Utf8TempDir {
        let dir = tempdir().expect("created temp dir");
        let config_path = dir.path().join(TestspanConfig::CONFIG_PATH);
        std::fs::create_dir_all(config_path.parent().expect("config path has a parent"))
            .expect("created .config dir");
        std::fs::write(&config_path, contents).expect("wrote config file");
        dir
    }

    #[test]
    fn default_config() {
        let dir = tempdir().expect("created temp dir");
        let config = TestspanConfig::from_sources(dir.path(), None).expect("default config parses");

        assert_eq!(config, TestspanConfig::default_config());
        assert_eq!(
            config.telemetry,
            TelemetryConfig {
                service_name: "testspan".to_owned(),
                service_version: None,
                exporter: ExporterKind::Otlp,
                endpoint: None,
                export_timeout: Duration::from_secs(10),
            }
        );
        assert_eq!(config.run, RunOverrides::default());
    }

    #[test]
    fn user_config_is_layered_over_default() {
        let dir = temp_dir_with_config(indoc! {r#"
            [telemetry]
            service-name = "checkout-e2e"
            service-version = "2.3.0"
            endpoint = "http://collector:4318/v1/traces"

            [run]
            root-dir = "/work/checkout"
        "#});
        let config = TestspanConfig::from_sources(dir.path(), None).expect("config parses");

        assert_eq!(config.telemetry.service_name, "checkout-e2e");
        assert_eq!(config.telemetry.service_version.as_deref(), Some("2.3.0"));
        assert_eq!(
            config.telemetry.endpoint.as_deref(),
            Some("http://collector:4318/v1/traces")
        );
        // Not overridden.
        assert_eq!(config.telemetry.exporter, ExporterKind::Otlp);
        assert_eq!(config.telemetry.export_timeout, Duration::from_secs(10));
        assert_eq!(
            config.run.root_dir.as_deref(),
            Some(Utf8Path::new("/work/checkout"))
        );
    }

    #[test]
    fn explicit_config_file() {
        let dir = tempdir().expect("created temp dir");
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            indoc! {r#"
                [telemetry]
                exporter = "none"
                export-timeout = "250ms"
            "#},
        )
        .expect("wrote config file");

        let config =
            TestspanConfig::from_sources(dir.path(), Some(&path)).expect("config parses");
        assert_eq!(config.telemetry.exporter, ExporterKind::None);
        assert_eq!(config.telemetry.export_timeout, Duration::from_millis(250));
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let dir = tempdir().expect("created temp dir");
        let path = dir.path().join("does-not-exist.toml");
        let error = TestspanConfig::from_sources(dir.path(), Some(&path))
            .expect_err("missing file is an error");

        assert_eq!(error.config_file(), path.as_path());
        assert!(matches!(error.kind(), ConfigParseErrorKind::BuildError(_)));
    }

    #[test]
    fn unknown_keys_are_warnings() {
        let dir = temp_dir_with_config(indoc! {r#"
            [telemetry]
            service-nme = "typo"

            [reporter]
            color = true
        "#});
        let mut warnings = CollectWarnings::default();
        let config = TestspanConfig::from_sources_with_warnings(dir.path(), None, &mut warnings)
            .expect("unknown keys are not errors");

        assert_eq!(config.telemetry.service_name, "testspan");
        assert_eq!(
            warnings.unknown,
            vec![BTreeSet::from([
                "reporter".to_owned(),
                "telemetry.service-nme".to_owned(),
            ])]
        );
    }

    #[test_case(
        indoc! {r#"
            [telemetry]
            exporter = "jaeger"
        "#}
        ; "unknown exporter"
    )]
    #[test_case(
        indoc! {r#"
            [telemetry]
            export-timeout = "soon"
        "#}
        ; "invalid duration"
    )]
    fn deserialize_errors(contents: &str) {
        let dir = temp_dir_with_config(contents);
        let error = TestspanConfig::from_sources(dir.path(), None).expect_err("config is invalid");
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::DeserializeError(_)),
            "unexpected error kind: {:?}",
            error.kind()
        );
    }

    #[test_case(
        indoc! {r#"
            [telemetry]
            service-name = "  "
        "#},
        "telemetry.service-name"
        ; "empty service name"
    )]
    #[test_case(
        indoc! {r#"
            [telemetry]
            export-timeout = "0s"
        "#},
        "telemetry.export-timeout"
        ; "zero timeout"
    )]
    fn invalid_values(contents: &str, expected_key: &str) {
        let dir = temp_dir_with_config(contents);
        let error = TestspanConfig::from_sources(dir.path(), None).expect_err("config is invalid");
        match error.kind() {
            ConfigParseErrorKind::InvalidValue { key, .. } => assert_eq!(*key, expected_key),
            other => panic!("unexpected error kind: {other:?}"),
        }
    }
}
