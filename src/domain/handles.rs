//! Typed handles for host-owned resources.
//!
//! The host identifies connections, open objects, and message handles by opaque
//! numeric values. This module wraps each of them in a newtype so that the two
//! state maps cannot be keyed with the wrong kind of number, and gives the
//! message handle its sentinel values and validity test.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle for one application connection to the queue manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionHandle(pub i32);

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for one object (queue or topic) opened on a connection.
///
/// Call sites that have no usable object handle (put1, or hosts that key all
/// synchronous gets together) express that with `Option<ObjectHandle>` rather
/// than a sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(pub i32);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for a bag of message properties managed by the host.
///
/// Unlike the other handles this one keeps the host's two sentinel values,
/// because the options structures carry them in-band: `NONE` (no handle
/// supplied) and `UNUSABLE` (field present but not usable on this call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle(pub i64);

impl MessageHandle {
    /// No handle supplied.
    pub const NONE: Self = Self(0);

    /// Field present but unusable for this call.
    pub const UNUSABLE: Self = Self(-1);

    /// Returns `true` when the handle refers to a real property bag.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::NONE.0 && self.0 != Self::UNUSABLE.0
    }
}

impl Default for MessageHandle {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lookup key for the per-connection state maps.
///
/// A key is a connection handle plus an optional object handle; `None` is the
/// connection-wide wildcard used where no single object is involved (put1, the
/// shared put-side handle). The `Display` form (`"12/34"`, `"12/*"`) appears in
/// log lines only; the maps themselves are keyed on the typed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Owning connection.
    pub connection: ConnectionHandle,
    /// Object within the connection, or `None` for the wildcard.
    pub object: Option<ObjectHandle>,
}

impl ObjectKey {
    /// Creates a key for a specific (connection, object) pair.
    #[must_use]
    pub const fn new(connection: ConnectionHandle, object: Option<ObjectHandle>) -> Self {
        Self { connection, object }
    }

    /// Creates the connection-wide wildcard key.
    #[must_use]
    pub const fn wildcard(connection: ConnectionHandle) -> Self {
        Self {
            connection,
            object: None,
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object {
            Some(object) => write!(f, "{}/{}", self.connection, object),
            None => write!(f, "{}/*", self.connection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_handle_sentinels_are_invalid() {
        assert!(!MessageHandle::NONE.is_valid());
        assert!(!MessageHandle::UNUSABLE.is_valid());
        assert!(MessageHandle(7).is_valid());
    }

    #[test]
    fn message_handle_default_is_none() {
        assert_eq!(MessageHandle::default(), MessageHandle::NONE);
    }

    #[test]
    fn object_key_display_includes_wildcard() {
        let key = ObjectKey::new(ConnectionHandle(12), Some(ObjectHandle(34)));
        assert_eq!(key.to_string(), "12/34");

        let key = ObjectKey::wildcard(ConnectionHandle(12));
        assert_eq!(key.to_string(), "12/*");
    }
}
