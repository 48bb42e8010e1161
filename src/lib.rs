//! OpenTelemetry context propagation for MQ-style messaging hosts.
//!
//! `mqotel` is the logic of an API exit: a module the queue manager loads
//! into the path of every application call so that outgoing messages carry
//! the W3C `traceparent` / `tracestate` properties of the application's
//! current span, and incoming messages get their context linked back to it.
//! The host calls in around each intercepted verb (open, close, put, put1,
//! get, async consume, disconnect); this crate decides what to do with the
//! call and hands back any options it substituted.
//!
//! The crate is host-agnostic: everything it needs from the queue manager
//! (message handles, properties, attribute inquiry) goes through the
//! [`HostServices`] trait, which a thin vendor shim implements over the real
//! entry points and [`InMemoryHost`] implements in-process.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use mqotel::{initialize, Config, InMemoryHost};
//!
//! let config = Config::from_env();
//! let host = Arc::new(InMemoryHost::new());
//! let exit = initialize(&config, host);
//!
//! // The host shim now routes its callbacks through `exit`:
//! // exit.put_before(..), exit.get_after(..), exit.disc_before(..), ...
//! ```
//!
//! # Configuration
//!
//! Read once from the environment by [`Config::from_env`]:
//!
//! - `MQOTEL_LOGFILE`: `stderr` (default), `stdout`, or a file path
//! - `MQOTEL_TRACE_FILE`: OTLP JSON file for spans recorded under the
//!   exit's subscriber
//! - `MQOTEL_TRACE_LEVEL`: filter when `RUST_LOG` is unset (default `info`)
//! - `MQOTEL_DISABLE`: disable propagation while keeping interception
//!   pass-through, for applications instrumented by another layer

pub mod codec;
pub mod correlate;
pub mod domain;
pub mod exit;
pub mod mqi;
pub mod observability;
pub mod state;

pub use correlate::{NoopCorrelator, OtelCorrelator, SpanCorrelator};
pub use domain::{
    ConnectionHandle, ExitError, MessageHandle, ObjectHandle, ObjectKey, Result,
};
pub use exit::ApiExit;
pub use mqi::{HostServices, InMemoryHost};

use std::path::PathBuf;
use std::sync::Arc;

/// Where the exit's log lines go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogTarget {
    /// Standard error.
    #[default]
    Stderr,
    /// Standard output.
    Stdout,
    /// A size-rotated file.
    File(PathBuf),
}

/// Exit configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Log destination.
    pub log_target: LogTarget,
    /// OTLP JSON file for spans recorded under the exit's subscriber;
    /// `None` disables span export.
    pub trace_file: Option<PathBuf>,
    /// Log filter used when `RUST_LOG` is not set.
    pub trace_level: Option<String>,
    /// Run with the no-op correlator: intercept, but neither inject nor link.
    pub disabled: bool,
}

impl Config {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_target = match lookup("MQOTEL_LOGFILE") {
            Some(v) if v.eq_ignore_ascii_case("stdout") => LogTarget::Stdout,
            Some(v) if v.eq_ignore_ascii_case("stderr") || v.is_empty() => LogTarget::Stderr,
            Some(v) => LogTarget::File(PathBuf::from(v)),
            None => LogTarget::Stderr,
        };
        Self {
            log_target,
            trace_file: lookup("MQOTEL_TRACE_FILE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            trace_level: lookup("MQOTEL_TRACE_LEVEL").filter(|v| !v.is_empty()),
            disabled: lookup("MQOTEL_DISABLE")
                .is_some_and(|v| v != "0" && !v.eq_ignore_ascii_case("false") && !v.is_empty()),
        }
    }
}

/// Sets up logging per the configuration and builds the exit instance.
///
/// When the configuration disables propagation the exit still intercepts
/// every call, but with the no-op correlator: options pass through unchanged
/// and nothing is injected or linked.
pub fn initialize(config: &Config, host: Arc<dyn HostServices>) -> ApiExit {
    observability::init_tracing(config);

    let correlator: Box<dyn SpanCorrelator> = if config.disabled {
        Box::new(NoopCorrelator)
    } else {
        Box::new(OtelCorrelator::new())
    };
    tracing::info!(disabled = config.disabled, "propagation exit ready");
    ApiExit::new(host, correlator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.log_target, LogTarget::Stderr);
        assert_eq!(config.trace_file, None);
        assert_eq!(config.trace_level, None);
        assert!(!config.disabled);
    }

    #[test]
    fn logfile_selects_the_target() {
        assert_eq!(
            config_from(&[("MQOTEL_LOGFILE", "stdout")]).log_target,
            LogTarget::Stdout
        );
        assert_eq!(
            config_from(&[("MQOTEL_LOGFILE", "STDERR")]).log_target,
            LogTarget::Stderr
        );
        assert_eq!(
            config_from(&[("MQOTEL_LOGFILE", "/var/log/exit.log")]).log_target,
            LogTarget::File(PathBuf::from("/var/log/exit.log"))
        );
    }

    #[test]
    fn disable_accepts_truthy_values_only() {
        assert!(config_from(&[("MQOTEL_DISABLE", "1")]).disabled);
        assert!(config_from(&[("MQOTEL_DISABLE", "true")]).disabled);
        assert!(!config_from(&[("MQOTEL_DISABLE", "0")]).disabled);
        assert!(!config_from(&[("MQOTEL_DISABLE", "false")]).disabled);
        assert!(!config_from(&[("MQOTEL_DISABLE", "")]).disabled);
    }

    #[test]
    fn trace_settings_parse() {
        let config = config_from(&[
            ("MQOTEL_TRACE_FILE", "/tmp/mqotel-otlp.json"),
            ("MQOTEL_TRACE_LEVEL", "debug"),
        ]);
        assert_eq!(config.trace_file, Some(PathBuf::from("/tmp/mqotel-otlp.json")));
        assert_eq!(config.trace_level.as_deref(), Some("debug"));
    }
}
