//! Tracer provider whose spans land in a local file.
//!
//! Inside a queue manager there is no collector endpoint to push to, so
//! spans reaching the exit's subscriber are exported to a rotating OTLP JSON
//! file next to its logs. Export is simple (per-span, unbatched): the volume
//! is low and a crash must not lose the spans before it.

use super::file_writer::RotatingWriter;
use super::otlp;
use futures_util::future::BoxFuture;
use opentelemetry::trace::TraceError;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::resource::Resource;
use opentelemetry_sdk::trace::TracerProvider;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Instrumentation scope name stamped on exported spans.
pub const SCOPE: &str = "mqotel";

struct FileSpanExporter {
    writer: RotatingWriter,
    resource: Resource,
    is_shutdown: AtomicBool,
}

impl SpanExporter for FileSpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        if self.is_shutdown.load(Ordering::SeqCst) {
            return Box::pin(std::future::ready(Err(TraceError::from(
                "exporter is shut down",
            ))));
        }
        let doc = otlp::format_batch(&self.resource, SCOPE, &batch);
        let result = self
            .writer
            .write_line(&doc.to_string())
            .map_err(|e| TraceError::from(e.to_string()));
        Box::pin(std::future::ready(result))
    }

    fn shutdown(&mut self) {
        self.is_shutdown.store(true, Ordering::SeqCst);
    }

    fn set_resource(&mut self, _res: &Resource) {}
}

impl std::fmt::Debug for FileSpanExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSpanExporter")
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

/// Builds a tracer provider that exports to the given file.
pub fn create_provider(path: PathBuf, resource: Resource) -> TracerProvider {
    let exporter = FileSpanExporter {
        writer: RotatingWriter::new(path),
        resource: resource.clone(),
        is_shutdown: AtomicBool::new(false),
    };
    TracerProvider::builder()
        .with_config(opentelemetry_sdk::trace::Config::default().with_resource(resource))
        .with_simple_exporter(exporter)
        .build()
}
