//! Subscriber setup.
//!
//! Builds the tracing pipeline from the exit's configuration: an env-filter,
//! a plain-text log layer aimed at the configured target, and (when a trace
//! file is configured) an OpenTelemetry layer exporting spans recorded under
//! this subscriber as OTLP JSON. The exit opens no spans of its own; the
//! layer captures what the embedding application records here.
//! Initialization is idempotent and deliberately quiet: when the embedding
//! application already installed a global subscriber, the exit joins it
//! instead of fighting over it.

use super::file_writer::{LogSink, RotatingWriter};
use super::tracer;
use crate::{Config, LogTarget};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::resource::Resource;
use std::io;
use std::sync::Arc;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes logging and span export for the exit.
///
/// The filter comes from `RUST_LOG` when set, falling back to the configured
/// trace level and finally to `info`. Repeated calls (one exit instance per
/// connection is common) are harmless.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.trace_level.as_deref().unwrap_or("info"))
    });

    let writer = match &config.log_target {
        LogTarget::Stderr => BoxMakeWriter::new(io::stderr),
        LogTarget::Stdout => BoxMakeWriter::new(io::stdout),
        LogTarget::File(path) => {
            BoxMakeWriter::new(LogSink(Arc::new(RotatingWriter::new(path.clone()))))
        }
    };
    let log_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer);

    let otel_layer = config.trace_file.as_ref().map(|path| {
        let resource = Resource::new(vec![opentelemetry::KeyValue::new(
            "service.name",
            tracer::SCOPE,
        )]);
        let provider = tracer::create_provider(path.clone(), resource);
        OpenTelemetryLayer::new(provider.tracer(tracer::SCOPE))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(log_layer)
        .with(otel_layer)
        .try_init();
}
