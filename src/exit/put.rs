//! Put interception: context injection on outgoing messages.
//!
//! A before-put captures the application's current span context and attaches
//! it to the outgoing message as properties. When the caller already supplied
//! a message handle the properties go straight onto it, and values the
//! application set itself are never overwritten. When there is no caller
//! handle the exit lazily creates one handle per connection, points the put
//! options' original-handle field at it, and hands the caller's options back
//! in the matching after-put.
//!
//! A message whose body already carries a traceparent in an RFH2 header is
//! treated as instrumented and passed through untouched.

use super::ApiExit;
use crate::codec::{rfh2, TRACEPARENT, TRACESTATE};
use crate::correlate::OutboundContext;
use crate::domain::{ConnectionHandle, MessageHandle, ObjectHandle, ObjectKey};
use crate::mqi::structures::{MessageDescriptor, PutOptions};
use tracing::{debug, warn};

impl ApiExit {
    /// Before-put on an open object.
    ///
    /// Returns the options the host should run the put with; callers must use
    /// the returned value, which may reference a handle owned by the exit.
    pub fn put_before(
        &self,
        conn: ConnectionHandle,
        obj: ObjectHandle,
        md: &MessageDescriptor,
        pmo: &PutOptions,
        body: &[u8],
    ) -> PutOptions {
        self.put_before_keyed(ObjectKey::new(conn, Some(obj)), md, pmo, body)
    }

    /// After-put on an open object.
    ///
    /// Returns the caller's original options when the matching before-put
    /// substituted them, so the host can hand the application back what it
    /// passed in.
    pub fn put_after(
        &self,
        conn: ConnectionHandle,
        obj: ObjectHandle,
        pmo: &PutOptions,
    ) -> Option<PutOptions> {
        self.put_after_keyed(ObjectKey::new(conn, Some(obj)), pmo)
    }

    /// Before-put1. Same flow as [`put_before`](Self::put_before), keyed to
    /// the connection because a put1 has no object handle.
    pub fn put1_before(
        &self,
        conn: ConnectionHandle,
        md: &MessageDescriptor,
        pmo: &PutOptions,
        body: &[u8],
    ) -> PutOptions {
        self.put_before_keyed(ObjectKey::wildcard(conn), md, pmo, body)
    }

    /// After-put1.
    pub fn put1_after(&self, conn: ConnectionHandle, pmo: &PutOptions) -> Option<PutOptions> {
        self.put_after_keyed(ObjectKey::wildcard(conn), pmo)
    }

    fn put_before_keyed(
        &self,
        key: ObjectKey,
        md: &MessageDescriptor,
        pmo: &PutOptions,
        body: &[u8],
    ) -> PutOptions {
        let app_span = tracing::Span::current();
        let Some(outbound) = self.correlator.current_outbound(&app_span) else {
            return pmo.clone();
        };

        // An in-body traceparent means some upstream layer already
        // instrumented this message.
        let mut skip_tracestate = false;
        if md.has_rfh2() {
            if rfh2::contains_property(body, TRACEPARENT) {
                debug!(key = %key, "body already carries a traceparent");
                return pmo.clone();
            }
            skip_tracestate = rfh2::contains_property(body, TRACESTATE);
        }

        if let Some(handle) = caller_handle(pmo) {
            self.inject_into_caller_handle(key, handle, &outbound, skip_tracestate);
            return pmo.clone();
        }

        // No caller handle: substitute our own. One handle serves every put
        // on the connection; the properties are rewritten per message.
        let Some(owned) = self.owned_handle(ObjectKey::wildcard(key.connection)) else {
            return pmo.clone();
        };
        if !self.inject(key.connection, owned, &outbound, skip_tracestate, false) {
            return pmo.clone();
        }
        self.table.save_put_options(key, pmo.clone());
        let mut out = pmo.clone();
        out.original_msg_handle = owned;
        debug!(key = %key, handle = %owned, "substituted put options");
        out
    }

    fn put_after_keyed(&self, key: ObjectKey, pmo: &PutOptions) -> Option<PutOptions> {
        if !self.table.owns_handle(key.connection, pmo.original_msg_handle) {
            return None;
        }
        self.table.take_put_options(key)
    }

    /// Writes context onto a handle the application supplied, without
    /// clobbering values it set itself.
    fn inject_into_caller_handle(
        &self,
        key: ObjectKey,
        handle: MessageHandle,
        outbound: &OutboundContext,
        skip_tracestate: bool,
    ) {
        let conn = key.connection;
        let existing = |name| match self.host.inquire_string_property(conn, handle, name) {
            Ok(found) => found.is_some(),
            Err(err) => {
                warn!(key = %key, handle = %handle, error = %err, "property inquiry failed");
                // Assume present rather than overwrite blindly.
                true
            }
        };
        if existing(TRACEPARENT) {
            debug!(key = %key, handle = %handle, "caller handle already carries a traceparent");
            return;
        }
        let skip_tracestate = skip_tracestate || existing(TRACESTATE);
        let _ = self.inject(conn, handle, outbound, skip_tracestate, true);
    }

    /// Sets the two properties on a handle. Returns `false` when even the
    /// traceparent could not be set.
    fn inject(
        &self,
        conn: ConnectionHandle,
        handle: MessageHandle,
        outbound: &OutboundContext,
        skip_tracestate: bool,
        caller_owned: bool,
    ) -> bool {
        if let Err(err) =
            self.host
                .set_string_property(conn, handle, TRACEPARENT, &outbound.traceparent)
        {
            warn!(conn = %conn, handle = %handle, error = %err, "could not set traceparent");
            return false;
        }
        if !skip_tracestate {
            if let Some(state) = outbound.tracestate.as_deref() {
                if let Err(err) = self.host.set_string_property(conn, handle, TRACESTATE, state) {
                    warn!(conn = %conn, handle = %handle, error = %err, "could not set tracestate");
                }
            }
        }
        debug!(conn = %conn, handle = %handle, caller_owned, traceparent = %outbound.traceparent,
            "injected outbound context");
        true
    }
}

fn caller_handle(pmo: &PutOptions) -> Option<MessageHandle> {
    if pmo.new_msg_handle.is_valid() {
        Some(pmo.new_msg_handle)
    } else if pmo.original_msg_handle.is_valid() {
        Some(pmo.original_msg_handle)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::{NoopCorrelator, SpanCorrelator};
    use crate::mqi::{HostServices, InMemoryHost};
    use std::sync::Arc;

    const CONN: ConnectionHandle = ConnectionHandle(1);
    const OBJ: ObjectHandle = ObjectHandle(2);
    const TP: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

    /// Correlator with a fixed outbound context, so the put flow can be
    /// exercised without wiring a tracing subscriber.
    struct StubCorrelator {
        tracestate: Option<&'static str>,
    }

    impl SpanCorrelator for StubCorrelator {
        fn current_outbound(&self, _span: &tracing::Span) -> Option<OutboundContext> {
            Some(OutboundContext {
                traceparent: TP.to_string(),
                tracestate: self.tracestate.map(str::to_string),
            })
        }

        fn link_inbound(&self, _: &tracing::Span, _: Option<&str>, _: Option<&str>) -> bool {
            false
        }
    }

    fn exit_with(correlator: Box<dyn SpanCorrelator>) -> (Arc<InMemoryHost>, ApiExit) {
        let host = Arc::new(InMemoryHost::new());
        let exit = ApiExit::new(Arc::clone(&host) as Arc<dyn HostServices>, correlator);
        (host, exit)
    }

    fn stub_exit() -> (Arc<InMemoryHost>, ApiExit) {
        exit_with(Box::new(StubCorrelator {
            tracestate: Some("acme=1"),
        }))
    }

    #[test]
    fn no_active_span_means_pass_through() {
        let (host, exit) = exit_with(Box::new(NoopCorrelator));
        let pmo = PutOptions::default();
        let out = exit.put_before(CONN, OBJ, &MessageDescriptor::default(), &pmo, b"payload");

        assert!(!out.original_msg_handle.is_valid());
        assert_eq!(host.handle_count(CONN), 0);
        assert!(exit.put_after(CONN, OBJ, &out).is_none());
    }

    #[test]
    fn substitutes_options_and_injects_both_properties() {
        let (host, exit) = stub_exit();
        let pmo = PutOptions {
            syncpoint: true,
            ..PutOptions::default()
        };
        let out = exit.put_before(CONN, OBJ, &MessageDescriptor::default(), &pmo, b"payload");

        let handle = out.original_msg_handle;
        assert!(handle.is_valid());
        assert_eq!(host.property(CONN, handle, TRACEPARENT).unwrap().as_deref(), Some(TP));
        assert_eq!(
            host.property(CONN, handle, TRACESTATE).unwrap().as_deref(),
            Some("acme=1")
        );

        let restored = exit.put_after(CONN, OBJ, &out).unwrap();
        assert!(restored.syncpoint);
        assert!(!restored.original_msg_handle.is_valid());
        // Restore happens once.
        assert!(exit.put_after(CONN, OBJ, &out).is_none());
    }

    #[test]
    fn put_and_put1_share_the_connection_handle() {
        let (host, exit) = stub_exit();
        let md = MessageDescriptor::default();
        let a = exit.put_before(CONN, OBJ, &md, &PutOptions::default(), b"");
        let b = exit.put1_before(CONN, &md, &PutOptions::default(), b"");

        assert_eq!(a.original_msg_handle, b.original_msg_handle);
        assert_eq!(host.handle_count(CONN), 1);
        assert!(exit.put1_after(CONN, &b).is_some());
    }

    #[test]
    fn caller_handle_is_used_without_substitution() {
        let (host, exit) = stub_exit();
        let handle = host.create_message_handle(CONN).unwrap();
        let pmo = PutOptions {
            new_msg_handle: handle,
            ..PutOptions::default()
        };
        let out = exit.put_before(CONN, OBJ, &MessageDescriptor::default(), &pmo, b"");

        assert_eq!(out.new_msg_handle, handle);
        assert!(!out.original_msg_handle.is_valid());
        assert_eq!(host.property(CONN, handle, TRACEPARENT).unwrap().as_deref(), Some(TP));
        assert!(exit.put_after(CONN, OBJ, &out).is_none());
    }

    #[test]
    fn caller_properties_are_never_overwritten() {
        let (host, exit) = stub_exit();
        let handle = host.create_message_handle(CONN).unwrap();
        host.set_string_property(CONN, handle, TRACEPARENT, "00-app-own-01")
            .unwrap();
        let pmo = PutOptions {
            original_msg_handle: handle,
            ..PutOptions::default()
        };
        let _ = exit.put_before(CONN, OBJ, &MessageDescriptor::default(), &pmo, b"");

        assert_eq!(
            host.property(CONN, handle, TRACEPARENT).unwrap().as_deref(),
            Some("00-app-own-01")
        );
        // The tracestate is skipped along with it.
        assert_eq!(host.property(CONN, handle, TRACESTATE).unwrap(), None);
    }

    #[test]
    fn instrumented_rfh2_body_passes_through() {
        let (host, exit) = stub_exit();
        let body = rfh2::build_with_properties(TP, None, b"payload");
        let md = MessageDescriptor {
            format: "MQHRF2  ".to_string(),
            ..MessageDescriptor::default()
        };
        let out = exit.put_before(CONN, OBJ, &md, &PutOptions::default(), &body);

        assert!(!out.original_msg_handle.is_valid());
        assert_eq!(host.handle_count(CONN), 0);
    }

    #[test]
    fn rfh2_tracestate_alone_still_injects_traceparent() {
        let (host, exit) = stub_exit();
        // Hand-build a body whose folder has only a tracestate.
        let mut body = rfh2::build_with_properties(TP, Some("upstream=1"), b"");
        // Blank out the traceparent tags so only tracestate remains findable.
        // Same-length byte replacement keeps the binary header lengths valid.
        let (needle, replacement) = (b"traceparent", b"xaceparentx");
        let mut i = 0;
        while i + needle.len() <= body.len() {
            if &body[i..i + needle.len()] == needle {
                body[i..i + needle.len()].copy_from_slice(replacement);
                i += needle.len();
            } else {
                i += 1;
            }
        }
        let md = MessageDescriptor {
            format: "MQHRF2".to_string(),
            ..MessageDescriptor::default()
        };
        let out = exit.put_before(CONN, OBJ, &md, &PutOptions::default(), &body);

        let handle = out.original_msg_handle;
        assert!(handle.is_valid());
        assert_eq!(host.property(CONN, handle, TRACEPARENT).unwrap().as_deref(), Some(TP));
        assert_eq!(host.property(CONN, handle, TRACESTATE).unwrap(), None);
    }

    #[test]
    fn foreign_handle_in_after_is_ignored() {
        let (host, exit) = stub_exit();
        let foreign = host.create_message_handle(CONN).unwrap();
        let pmo = PutOptions {
            original_msg_handle: foreign,
            ..PutOptions::default()
        };
        assert!(exit.put_after(CONN, OBJ, &pmo).is_none());
    }
}
