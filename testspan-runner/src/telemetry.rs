// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Setting up and tearing down the OpenTelemetry pipeline.

use crate::{
    config::{ExporterKind, TelemetryConfig},
    errors::{TelemetryInitError, TelemetryShutdownError},
};
use opentelemetry::{InstrumentationScope, KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource,
    trace::{SdkTracer, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::resource::SERVICE_VERSION;
use tracing::debug;

/// The instrumentation scope name of spans created by testspan.
pub const TRACER_NAME: &str = "testspan";

/// Owns the tracer provider for the lifetime of a run.
///
/// Spans are only guaranteed to be exported once [`shutdown`](Self::shutdown)
/// returns.
#[derive(Debug)]
pub struct TelemetryHandle {
    provider: SdkTracerProvider,
}

impl TelemetryHandle {
    /// Builds a tracer provider from `config`.
    pub fn init(config: &TelemetryConfig) -> Result<Self, TelemetryInitError> {
        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .with_attributes(
                config
                    .service_version
                    .iter()
                    .map(|version| KeyValue::new(SERVICE_VERSION, version.clone())),
            )
            .build();
        let mut builder = SdkTracerProvider::builder().with_resource(resource);

        match config.exporter {
            ExporterKind::Otlp => {
                let mut exporter = SpanExporter::builder()
                    .with_http()
                    .with_timeout(config.export_timeout);
                if let Some(endpoint) = &config.endpoint {
                    exporter = exporter.with_endpoint(endpoint.clone());
                }
                let exporter = exporter
                    .build()
                    .map_err(|err| TelemetryInitError::new(&config.service_name, err))?;
                debug!(
                    endpoint = config.endpoint.as_deref(),
                    timeout = ?config.export_timeout,
                    "exporting spans over OTLP/HTTP"
                );
                builder = builder.with_batch_exporter(exporter);
            }
            ExporterKind::None => {
                debug!("span export disabled");
            }
        }

        Ok(Self {
            provider: builder.build(),
        })
    }

    /// Wraps an existing provider, for example one exporting to memory.
    pub fn from_provider(provider: SdkTracerProvider) -> Self {
        Self { provider }
    }

    /// Returns the tracer reporters should start spans with.
    pub fn tracer(&self) -> SdkTracer {
        let scope = InstrumentationScope::builder(TRACER_NAME)
            .with_version(env!("CARGO_PKG_VERSION"))
            .build();
        self.provider.tracer_with_scope(scope)
    }

    /// Flushes ended spans and shuts the provider down.
    pub fn shutdown(self) -> Result<(), TelemetryShutdownError> {
        self.provider
            .shutdown()
            .map_err(TelemetryShutdownError::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestspanConfig;
    use opentelemetry::trace::{Span as _, Tracer as _};
    use opentelemetry_sdk::trace::InMemorySpanExporter;

    #[test]
    fn tracer_scope() {
        let exporter = InMemorySpanExporter::default();
        let handle = TelemetryHandle::from_provider(
            SdkTracerProvider::builder()
                .with_simple_exporter(exporter.clone())
                .build(),
        );
        handle.tracer().start("span").end();

        let spans = exporter.get_finished_spans().expect("spans are available");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].instrumentation_scope.name(), TRACER_NAME);
        assert_eq!(
            spans[0].instrumentation_scope.version(),
            Some(env!("CARGO_PKG_VERSION"))
        );
        handle.shutdown().expect("shutdown succeeds");
    }

    #[test]
    fn init_without_exporter() {
        let mut config = TestspanConfig::default_config().telemetry;
        config.exporter = ExporterKind::None;
        config.service_version = Some("1.2.3".to_owned());

        let handle = TelemetryHandle::init(&config).expect("init succeeds");
        handle.tracer().start("dropped").end();
        handle.shutdown().expect("shutdown succeeds");
    }
}
