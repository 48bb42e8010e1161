//! Carrier adapter between message properties and the propagation API.
//!
//! The propagation machinery wants to read and write string key/value pairs
//! through the `Injector`/`Extractor` traits. [`PropertyCarrier`] is that pair
//! of adapters over a plain map, with keys normalized to lowercase the way the
//! W3C header names are written.

use opentelemetry::propagation::{Extractor, Injector};
use std::collections::HashMap;

/// Property name carrying the W3C trace parent.
pub const TRACEPARENT: &str = "traceparent";

/// Property name carrying the W3C trace state.
pub const TRACESTATE: &str = "tracestate";

/// A small bag of propagation properties.
#[derive(Debug, Default, Clone)]
pub struct PropertyCarrier {
    entries: HashMap<String, String>,
}

impl PropertyCarrier {
    /// Creates an empty carrier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a carrier from inbound values, skipping absent ones.
    #[must_use]
    pub fn from_inbound(traceparent: Option<&str>, tracestate: Option<&str>) -> Self {
        let mut carrier = Self::new();
        if let Some(value) = traceparent {
            carrier.set(TRACEPARENT, value.to_string());
        }
        if let Some(value) = tracestate {
            carrier.set(TRACESTATE, value.to_string());
        }
        carrier
    }

    /// The traceparent value, if present.
    #[must_use]
    pub fn traceparent(&self) -> Option<&str> {
        self.get(TRACEPARENT)
    }

    /// The tracestate value, if present.
    #[must_use]
    pub fn tracestate(&self) -> Option<&str> {
        self.get(TRACESTATE)
    }

    /// Returns `true` when no properties were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Injector for PropertyCarrier {
    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_lowercase(), value);
    }
}

impl Extractor for PropertyCarrier {
    fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key.to_lowercase()).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive() {
        let mut carrier = PropertyCarrier::new();
        carrier.set("TraceParent", "00-aa-bb-01".to_string());

        assert_eq!(carrier.get("traceparent"), Some("00-aa-bb-01"));
        assert_eq!(carrier.traceparent(), Some("00-aa-bb-01"));
        assert_eq!(carrier.tracestate(), None);
    }

    #[test]
    fn from_inbound_skips_absent_values() {
        let carrier = PropertyCarrier::from_inbound(Some("00-aa-bb-01"), None);
        assert_eq!(carrier.keys().len(), 1);

        let carrier = PropertyCarrier::from_inbound(None, None);
        assert!(carrier.is_empty());
    }
}
