//! Rich (RFH2) header codec.
//!
//! When a queue delivers properties in the message body instead of a handle,
//! the body starts with a fixed 36-byte header followed by length-prefixed
//! name/value folders such as `<usr><traceparent>...</traceparent></usr>`.
//! This module reads just enough of that layout to pull single property
//! values out, and can build a minimal header for tests and for peers that
//! only accept in-body properties.
//!
//! The folder payload looks like XML but is not parsed as XML: a property is
//! found by scanning for its opening and closing tags, which matches how the
//! folders are actually produced.

use crate::codec::carrier::{TRACEPARENT, TRACESTATE};
use std::fmt::Write as _;

/// Length of the fixed part of the header, before any folders.
pub const FIXED_LEN: usize = 36;

/// Structure identifier at the start of the header.
const STRUC_ID: &[u8; 4] = b"RFH ";

const VERSION_2: i32 = 2;

/// Offset of the total structure length within the fixed part.
const STRUC_LENGTH_OFFSET: usize = 8;

fn read_i32(body: &[u8], offset: usize) -> Option<i32> {
    let bytes = body.get(offset..offset + 4)?;
    // Header integers travel in the platform's native byte order.
    Some(i32::from_ne_bytes(bytes.try_into().ok()?))
}

/// Returns the total header length (fixed part plus folders) when the body
/// starts with a plausible RFH2, `None` otherwise.
#[must_use]
pub fn header_length(body: &[u8]) -> Option<usize> {
    if body.len() < FIXED_LEN || &body[..4] != STRUC_ID {
        return None;
    }
    let len = read_i32(body, STRUC_LENGTH_OFFSET)?;
    let len = usize::try_from(len).ok()?;
    if len < FIXED_LEN || len > body.len() {
        return None;
    }
    Some(len)
}

/// Iterates the name/value folders of a header whose total length is already
/// known. Each folder is a native-endian length word followed by that many
/// bytes of folder text (the length includes the folder's trailing padding).
fn folders(body: &[u8], header_len: usize) -> impl Iterator<Item = &[u8]> + '_ {
    let mut pos = FIXED_LEN;
    std::iter::from_fn(move || {
        if pos + 4 > header_len {
            return None;
        }
        let len = usize::try_from(read_i32(body, pos)?).ok()?;
        let start = pos + 4;
        let end = start.checked_add(len)?;
        if end > header_len {
            return None;
        }
        pos = end;
        body.get(start..end)
    })
}

/// Finds a property value in the header's folders by tag name.
///
/// Returns `None` when the body has no valid header or no folder carries the
/// property. The value is returned with surrounding whitespace trimmed.
#[must_use]
pub fn property_value(body: &[u8], name: &str) -> Option<String> {
    let header_len = header_length(body)?;
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    for folder in folders(body, header_len) {
        let text = String::from_utf8_lossy(folder);
        if let Some(start) = text.find(&open) {
            let rest = &text[start + open.len()..];
            if let Some(end) = rest.find(&close) {
                return Some(rest[..end].trim().to_string());
            }
        }
    }
    None
}

/// Returns `true` when the header already carries the given property.
#[must_use]
pub fn contains_property(body: &[u8], name: &str) -> bool {
    property_value(body, name).is_some()
}

/// Builds a message body consisting of an RFH2 with a `usr` folder holding
/// the given propagation values, followed by the payload.
#[must_use]
pub fn build_with_properties(
    traceparent: &str,
    tracestate: Option<&str>,
    payload: &[u8],
) -> Vec<u8> {
    let mut folder = format!("<usr><{TRACEPARENT}>{traceparent}</{TRACEPARENT}>");
    if let Some(state) = tracestate {
        let _ = write!(folder, "<{TRACESTATE}>{state}</{TRACESTATE}>");
    }
    folder.push_str("</usr>");
    // Folders are space-padded to a four-byte boundary; the length word
    // counts the padding.
    while folder.len() % 4 != 0 {
        folder.push(' ');
    }

    let total = FIXED_LEN + 4 + folder.len();
    let mut body = Vec::with_capacity(total + payload.len());
    body.extend_from_slice(STRUC_ID);
    body.extend_from_slice(&VERSION_2.to_ne_bytes());
    body.extend_from_slice(&i32::try_from(total).unwrap_or(i32::MAX).to_ne_bytes());
    body.extend_from_slice(&546i32.to_ne_bytes()); // encoding
    body.extend_from_slice(&1208i32.to_ne_bytes()); // folder ccsid
    body.extend_from_slice(b"MQSTR   "); // format of what follows
    body.extend_from_slice(&0i32.to_ne_bytes()); // flags
    body.extend_from_slice(&1208i32.to_ne_bytes()); // name/value ccsid
    body.extend_from_slice(&i32::try_from(folder.len()).unwrap_or(0).to_ne_bytes());
    body.extend_from_slice(folder.as_bytes());
    body.extend_from_slice(payload);
    body
}

/// Short hex rendering of a body prefix for debug logging.
#[must_use]
pub fn hex_preview(data: &[u8], max: usize) -> String {
    let shown = &data[..data.len().min(max)];
    let mut out = String::with_capacity(shown.len() * 3);
    for (i, byte) in shown.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    if data.len() > max {
        out.push_str(" ..");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TP: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

    #[test]
    fn build_then_find_properties() {
        let body = build_with_properties(TP, Some("acme=1"), b"hello");

        let len = header_length(&body).unwrap();
        assert!(len % 4 == 0);
        assert_eq!(&body[len..], b"hello");
        assert_eq!(property_value(&body, TRACEPARENT).as_deref(), Some(TP));
        assert_eq!(property_value(&body, TRACESTATE).as_deref(), Some("acme=1"));
        assert!(contains_property(&body, TRACEPARENT));
        assert!(!contains_property(&body, "baggage"));
    }

    #[test]
    fn no_tracestate_folder_when_absent() {
        let body = build_with_properties(TP, None, b"");
        assert_eq!(property_value(&body, TRACESTATE), None);
    }

    #[test]
    fn rejects_bodies_without_a_header() {
        assert_eq!(header_length(b"hello world"), None);
        assert_eq!(header_length(b""), None);
        assert_eq!(property_value(b"<usr><traceparent>x</traceparent></usr>", TRACEPARENT), None);
    }

    #[test]
    fn rejects_length_beyond_body() {
        let mut body = build_with_properties(TP, None, b"");
        let bogus = i32::try_from(body.len() + 100).unwrap().to_ne_bytes();
        body[STRUC_LENGTH_OFFSET..STRUC_LENGTH_OFFSET + 4].copy_from_slice(&bogus);
        assert_eq!(header_length(&body), None);
    }

    #[test]
    fn truncated_folder_does_not_panic() {
        let body = build_with_properties(TP, None, b"");
        let len = header_length(&body).unwrap();
        // Chop the folder in half but leave the declared length alone by
        // shrinking the structure length instead.
        let mut short = body[..len - 8].to_vec();
        let declared = i32::try_from(short.len()).unwrap().to_ne_bytes();
        short[STRUC_LENGTH_OFFSET..STRUC_LENGTH_OFFSET + 4].copy_from_slice(&declared);
        assert_eq!(property_value(&short, TRACEPARENT), None);
    }

    #[test]
    fn hex_preview_truncates() {
        assert_eq!(hex_preview(b"RFH ", 8), "52 46 48 20");
        assert_eq!(hex_preview(b"RFH RFH RFH ", 4), "52 46 48 20 ..");
    }
}
