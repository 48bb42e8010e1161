//! W3C `traceparent` parsing.
//!
//! A traceparent is four dash-separated hex fields:
//! `{version:2}-{trace_id:32}-{parent_id:16}-{flags:2}`. The full context
//! extraction goes through the propagator; this module exists for the places
//! that only need the shape check or the trace ID for log correlation.

/// One parsed traceparent, borrowing from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceParent<'a> {
    /// Version field (`00` today).
    pub version: &'a str,
    /// 32-hex-digit trace ID.
    pub trace_id: &'a str,
    /// 16-hex-digit parent span ID.
    pub parent_id: &'a str,
    /// Trace flags; bit 0 is "sampled".
    pub flags: &'a str,
}

impl<'a> TraceParent<'a> {
    /// Parses a traceparent, returning `None` when the shape is wrong.
    #[must_use]
    pub fn parse(value: &'a str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let parent_id = parts.next()?;
        let flags = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        if !(field_ok(version, 2) && field_ok(trace_id, 32) && field_ok(parent_id, 16) && field_ok(flags, 2))
        {
            return None;
        }
        // All-zero trace or span IDs are defined as invalid.
        if trace_id.bytes().all(|b| b == b'0') || parent_id.bytes().all(|b| b == b'0') {
            return None;
        }
        Some(Self {
            version,
            trace_id,
            parent_id,
            flags,
        })
    }

    /// Returns `true` when the sampled flag is set.
    #[must_use]
    pub fn sampled(&self) -> bool {
        u8::from_str_radix(self.flags, 16).is_ok_and(|f| f & 0x01 != 0)
    }
}

fn field_ok(field: &str, len: usize) -> bool {
    field.len() == len && field.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Returns the trace ID of a traceparent value, for log correlation.
#[must_use]
pub fn trace_id(value: &str) -> Option<&str> {
    TraceParent::parse(value).map(|tp| tp.trace_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

    #[test]
    fn parses_a_valid_header() {
        let tp = TraceParent::parse(VALID).unwrap();
        assert_eq!(tp.trace_id, "0af7651916cd43dd8448eb211c80319c");
        assert_eq!(tp.parent_id, "b7ad6b7169203331");
        assert!(tp.sampled());
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(TraceParent::parse("").is_none());
        assert!(TraceParent::parse("00-abc-def-01").is_none());
        assert!(TraceParent::parse("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331").is_none());
        assert!(TraceParent::parse(&format!("{VALID}-ff")).is_none());
        // Non-hex digits.
        assert!(
            TraceParent::parse("00-zzf7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01").is_none()
        );
    }

    #[test]
    fn rejects_zero_ids() {
        assert!(TraceParent::parse(
            "00-00000000000000000000000000000000-b7ad6b7169203331-01"
        )
        .is_none());
        assert!(TraceParent::parse(
            "00-0af7651916cd43dd8448eb211c80319c-0000000000000000-01"
        )
        .is_none());
    }

    #[test]
    fn unsampled_flag() {
        let tp =
            TraceParent::parse("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-00").unwrap();
        assert!(!tp.sampled());
    }

    #[test]
    fn trace_id_helper() {
        assert_eq!(trace_id(VALID), Some("0af7651916cd43dd8448eb211c80319c"));
        assert_eq!(trace_id("garbage"), None);
    }
}
