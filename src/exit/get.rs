//! Get interception: context extraction from incoming messages.
//!
//! The difficulty on the receive side is that the application may have asked
//! for its message in a way that discards properties. A before-get therefore
//! substitutes options requesting properties-in-handle whenever the
//! application's own request would suppress them; otherwise the message is
//! left alone and any context arrives either in a caller handle or as an RFH2
//! header in the body. The after-get reads the context from whichever place
//! it landed and links it to the application's current span.
//!
//! Asynchronous consumers go through the same two halves: registration routes
//! through the before-get flow, each delivery through the extract-and-link
//! half.

use super::ApiExit;
use crate::codec::{rfh2, traceparent, TRACEPARENT, TRACESTATE};
use crate::domain::{ConnectionHandle, ObjectHandle, ObjectKey};
use crate::mqi::structures::{
    CallbackContext, CallbackDescriptor, CallbackKind, Completion, DeliveryCall, GetOptions,
    MessageDescriptor, PropertyControl, PropertyOption,
};
use tracing::{debug, trace, warn};

impl ApiExit {
    /// Before-get.
    ///
    /// Returns the options the host should run the get with. A caller that
    /// supplied its own message handle keeps it; otherwise, when the request
    /// would suppress properties, the returned options ask for
    /// properties-in-handle using a handle owned by the exit.
    pub fn get_before(
        &self,
        conn: ConnectionHandle,
        obj: ObjectHandle,
        gmo: &GetOptions,
    ) -> GetOptions {
        if gmo.msg_handle.is_valid() {
            return gmo.clone();
        }

        let key = ObjectKey::new(conn, Some(obj));
        let suppressed = match gmo.properties {
            PropertyOption::None => true,
            PropertyOption::AsQueueDef => {
                self.table.property_control(key) == Some(PropertyControl::None)
            }
            _ => false,
        };
        if !suppressed {
            return gmo.clone();
        }

        let Some(owned) = self.owned_handle(key) else {
            return gmo.clone();
        };
        self.table.save_get_options(key, gmo.clone());
        let mut out = gmo.clone();
        out.properties = PropertyOption::InHandle;
        out.msg_handle = owned;
        debug!(key = %key, handle = %owned, "substituted get options");
        out
    }

    /// After-get.
    ///
    /// Extracts inbound context from the message (handle first, RFH2 header
    /// as fallback) and links it to the current span, then returns the
    /// caller's original options when the matching before-get substituted
    /// them. A failed get still restores, but reads nothing.
    pub fn get_after(
        &self,
        conn: ConnectionHandle,
        obj: ObjectHandle,
        md: &MessageDescriptor,
        gmo: &GetOptions,
        body: &[u8],
        completion: Completion,
    ) -> Option<GetOptions> {
        let key = ObjectKey::new(conn, Some(obj));
        let restore = if self.table.owns_handle(conn, gmo.msg_handle) {
            self.table.take_get_options(key)
        } else {
            None
        };

        if completion.message_delivered() {
            self.extract_and_link(conn, key, md, gmo, body);
        }
        restore
    }

    /// Before-callback-registration. Consumer registrations route through the
    /// before-get flow; event handlers never see messages and are skipped.
    pub fn consume_before(
        &self,
        conn: ConnectionHandle,
        obj: ObjectHandle,
        cbd: &CallbackDescriptor,
        gmo: &GetOptions,
    ) -> Option<GetOptions> {
        if cbd.kind != CallbackKind::MessageConsumer {
            return None;
        }
        Some(self.get_before(conn, obj, gmo))
    }

    /// Before an asynchronous delivery callback runs.
    ///
    /// Links the message's inbound context like an after-get would, but never
    /// restores options: the registered options stay in force for the life of
    /// the consumer.
    pub fn deliver_before(
        &self,
        conn: ConnectionHandle,
        obj: ObjectHandle,
        md: &MessageDescriptor,
        gmo: &GetOptions,
        body: &[u8],
        cbc: &CallbackContext,
    ) {
        if cbc.call != DeliveryCall::MessageRemoved || !cbc.completion.message_delivered() {
            return;
        }
        let key = ObjectKey::new(conn, Some(obj));
        self.extract_and_link(conn, key, md, gmo, body);
    }

    fn extract_and_link(
        &self,
        conn: ConnectionHandle,
        key: ObjectKey,
        md: &MessageDescriptor,
        gmo: &GetOptions,
        body: &[u8],
    ) -> bool {
        let app_span = tracing::Span::current();

        let (tp, ts) = if gmo.msg_handle.is_valid() {
            let read = |name| match self.host.inquire_string_property(conn, gmo.msg_handle, name) {
                Ok(value) => value,
                Err(err) => {
                    warn!(key = %key, handle = %gmo.msg_handle, error = %err,
                        "property inquiry failed");
                    None
                }
            };
            (read(TRACEPARENT), read(TRACESTATE))
        } else if md.has_rfh2() {
            trace!(key = %key, header = %rfh2::hex_preview(body, 64), "scanning rich header");
            (
                rfh2::property_value(body, TRACEPARENT),
                rfh2::property_value(body, TRACESTATE),
            )
        } else {
            (None, None)
        };

        if tp.is_none() && ts.is_none() {
            return false;
        }
        let trace_id = tp.as_deref().and_then(traceparent::trace_id);
        let linked = self
            .correlator
            .link_inbound(&app_span, tp.as_deref(), ts.as_deref());
        debug!(key = %key, trace_id = trace_id.unwrap_or("-"), linked, "inbound context");
        linked
    }
}
