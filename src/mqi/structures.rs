//! Host call structures: message descriptor, object descriptor, get/put options.
//!
//! These are owned Rust renderings of the fixed structures the host passes into
//! the exit callbacks. Only the fields the propagation logic actually inspects
//! or rewrites are modeled; everything else stays opaque to this crate and is
//! carried untouched by the host shim.
//!
//! The vendor encodes "which structure fields exist" as a version number; here
//! the handle fields always exist and use [`MessageHandle::NONE`] when the
//! caller did not supply one, so the version dance disappears.

use crate::domain::MessageHandle;
use serde::{Deserialize, Serialize};

/// Format name carried by a message descriptor when the body starts with a
/// rich (RFH2) header.
pub const FORMAT_RF_HEADER_2: &str = "MQHRF2";

/// Format name for plain character data.
pub const FORMAT_STRING: &str = "MQSTR";

/// Message descriptor accompanying a put or got message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDescriptor {
    /// Format of the message body (e.g. [`FORMAT_STRING`], [`FORMAT_RF_HEADER_2`]).
    ///
    /// The vendor pads this to eight characters with blanks; comparisons in
    /// this crate always trim trailing blanks first.
    pub format: String,
    /// Character set of the body.
    pub ccsid: i32,
    /// Numeric encoding of the body.
    pub encoding: i32,
    /// Message ID (24 bytes).
    pub msg_id: [u8; 24],
    /// Correlation ID (24 bytes).
    pub correl_id: [u8; 24],
}

impl Default for MessageDescriptor {
    fn default() -> Self {
        Self {
            format: FORMAT_STRING.to_string(),
            ccsid: 819,
            encoding: 546,
            msg_id: [0u8; 24],
            correl_id: [0u8; 24],
        }
    }
}

impl MessageDescriptor {
    /// Returns `true` when the body is declared to start with an RFH2 header.
    #[must_use]
    pub fn has_rfh2(&self) -> bool {
        self.format.trim_end() == FORMAT_RF_HEADER_2
    }
}

/// Kind of object named by an object descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectType {
    /// A queue.
    #[default]
    Queue,
    /// A topic.
    Topic,
}

/// Object descriptor identifying the target of an open.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    /// Object kind.
    pub object_type: ObjectType,
    /// Object name (queue or topic name).
    pub object_name: String,
    /// Queue manager name (blank = local).
    pub object_qmgr_name: String,
}

/// Input disposition requested on an open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenInput {
    /// Not opened for input.
    #[default]
    None,
    /// Input with the queue-defined sharing.
    AsQueueDef,
    /// Shared input.
    Shared,
    /// Exclusive input.
    Exclusive,
}

/// Options supplied on an open call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OpenOptions {
    /// Input disposition. Browse does not count as input here.
    pub input: OpenInput,
    /// Opened for browsing.
    pub browse: bool,
    /// Opened for output.
    pub output: bool,
    /// Opened with inquire, allowing attribute inquiry on the same handle.
    pub inquire: bool,
}

impl OpenOptions {
    /// Returns `true` when the open could later feed destructive gets, which is
    /// when the property-control attribute becomes worth discovering.
    #[must_use]
    pub const fn for_input(&self) -> bool {
        !matches!(self.input, OpenInput::None)
    }
}

/// How a get call wants message properties returned.
///
/// Mirrors the host's mutually-exclusive property option group on the get
/// options structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PropertyOption {
    /// Defer to the queue's property-control attribute.
    #[default]
    AsQueueDef,
    /// Return properties in the supplied message handle.
    InHandle,
    /// Return properties as an RFH2 header in the body.
    ForceRfh2,
    /// Discard properties.
    None,
    /// Pre-v7 compatibility behavior.
    Compatibility,
}

/// The queue's property-control attribute, discovered at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PropertyControl {
    /// Not discovered (inquiry failed or never ran).
    #[default]
    Unknown,
    /// Properties are discarded.
    None,
    /// Compatibility: properties may arrive in an RFH2.
    Compat,
    /// All properties are delivered, in a handle when one is supplied.
    All,
    /// Properties are forced into an RFH2 header.
    Force,
    /// V6 compatibility behavior.
    V6Compat,
}

/// Options supplied on a get call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetOptions {
    /// Wait interval in milliseconds (-1 = unlimited).
    pub wait_interval: i32,
    /// Non-destructive browse.
    pub browse: bool,
    /// Accept truncated messages.
    pub accept_truncated: bool,
    /// Convert message data.
    pub convert: bool,
    /// Get under syncpoint.
    pub syncpoint: bool,
    /// Requested property delivery.
    pub properties: PropertyOption,
    /// Caller-supplied message handle, or [`MessageHandle::NONE`].
    pub msg_handle: MessageHandle,
}

/// Options supplied on a put or put1 call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PutOptions {
    /// Generate a new message ID.
    pub new_msg_id: bool,
    /// Put under syncpoint.
    pub syncpoint: bool,
    /// Handle whose properties are to be set on the new message, or
    /// [`MessageHandle::NONE`].
    pub new_msg_handle: MessageHandle,
    /// Handle carrying properties from an original message, or
    /// [`MessageHandle::NONE`]. This is also the field the exit points at its
    /// own handle when it substitutes options.
    pub original_msg_handle: MessageHandle,
}

/// Completion code reported by the host for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompCode {
    /// Call succeeded.
    #[default]
    Ok,
    /// Call succeeded with a warning reason.
    Warning,
    /// Call failed.
    Failed,
}

/// Reason code qualifying a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Reason {
    /// No additional reason.
    #[default]
    None,
    /// Message delivered but truncated; still counts as a message.
    TruncatedMsgAccepted,
    /// No message matched the get.
    NoMsgAvailable,
    /// Any other host reason code.
    Other(i32),
}

/// Completion state of the intercepted call, as seen by an after-callback.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Completion {
    /// Completion code.
    pub code: CompCode,
    /// Qualifying reason.
    pub reason: Reason,
}

impl Completion {
    /// A successful completion.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            code: CompCode::Ok,
            reason: Reason::None,
        }
    }

    /// A failed completion with the given reason.
    #[must_use]
    pub const fn failed(reason: Reason) -> Self {
        Self {
            code: CompCode::Failed,
            reason,
        }
    }

    /// Returns `true` when a message was actually delivered to the
    /// application: success, or truncation that the caller accepted.
    #[must_use]
    pub fn message_delivered(&self) -> bool {
        self.code == CompCode::Ok || self.reason == Reason::TruncatedMsgAccepted
    }
}

/// Kind of callback being registered on a consume call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CallbackKind {
    /// A message consumer; gets are routed through the exit.
    #[default]
    MessageConsumer,
    /// An event handler; never sees message data.
    EventHandler,
}

/// Descriptor for a callback registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackDescriptor {
    /// What the callback is for.
    pub kind: CallbackKind,
}

/// Why an asynchronous delivery callback is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeliveryCall {
    /// A message was removed from the queue for this consumer.
    #[default]
    MessageRemoved,
    /// A message was browsed but not removed.
    MessageNotRemoved,
    /// A non-message event (start, stop, deregister).
    Event,
}

/// Context accompanying an asynchronous delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackContext {
    /// Why the callback fired.
    pub call: DeliveryCall,
    /// Completion of the underlying get.
    pub completion: Completion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_detects_rfh2_with_blank_padding() {
        let mut md = MessageDescriptor::default();
        assert!(!md.has_rfh2());

        md.format = "MQHRF2  ".to_string();
        assert!(md.has_rfh2());
    }

    #[test]
    fn open_options_input_detection() {
        let opts = OpenOptions::default();
        assert!(!opts.for_input());

        let opts = OpenOptions {
            input: OpenInput::Shared,
            ..OpenOptions::default()
        };
        assert!(opts.for_input());

        // Browse alone is not input.
        let opts = OpenOptions {
            browse: true,
            ..OpenOptions::default()
        };
        assert!(!opts.for_input());
    }

    #[test]
    fn completion_message_delivered() {
        assert!(Completion::ok().message_delivered());
        assert!(Completion {
            code: CompCode::Warning,
            reason: Reason::TruncatedMsgAccepted,
        }
        .message_delivered());
        assert!(!Completion::failed(Reason::NoMsgAvailable).message_delivered());
    }

    #[test]
    fn get_options_default_has_no_handle() {
        let gmo = GetOptions::default();
        assert_eq!(gmo.properties, PropertyOption::AsQueueDef);
        assert!(!gmo.msg_handle.is_valid());
    }
}
