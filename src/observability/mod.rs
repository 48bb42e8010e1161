//! Logging and span export for the exit itself.
//!
//! Everything here serves the exit's own diagnostics; the application's
//! tracing pipeline is never touched beyond reading its current span. The
//! pipeline is `tracing` macros → env-filtered subscriber → a plain-text log
//! target plus, optionally, an OTLP JSON trace file. Both file outputs rotate
//! by size so a long-lived queue manager process cannot fill a disk.
//!
//! - [`init`]: subscriber setup from [`Config`](crate::Config)
//! - [`tracer`]: tracer provider with file-based span export
//! - [`otlp`]: OTLP JSON rendering
//! - [`file_writer`]: size-rotated file writing

mod file_writer;
mod init;
mod otlp;
mod tracer;

pub use init::init_tracing;
