//! The exit itself: interception logic for the host's call lifecycle.
//!
//! The host shim owns one [`ApiExit`] per loaded exit instance and calls the
//! before/after methods from its dispatch threads. Every method is non-fatal
//! by construction: the intercepted application call must proceed unchanged
//! when anything here fails, so errors are logged and swallowed at this
//! boundary rather than propagated to the host.
//!
//! Callbacks for one connection arrive serialized; different connections may
//! call in concurrently, which the state table is built for.

mod get;
mod open;
mod put;

use crate::correlate::SpanCorrelator;
use crate::domain::{ConnectionHandle, MessageHandle, ObjectKey};
use crate::mqi::HostServices;
use crate::state::ConnectionTable;
use std::sync::Arc;
use tracing::{debug, warn};

/// One loaded instance of the propagation exit.
pub struct ApiExit {
    table: ConnectionTable,
    host: Arc<dyn HostServices>,
    correlator: Box<dyn SpanCorrelator>,
}

impl ApiExit {
    /// Creates an exit instance over the given host services and correlator.
    #[must_use]
    pub fn new(host: Arc<dyn HostServices>, correlator: Box<dyn SpanCorrelator>) -> Self {
        Self {
            table: ConnectionTable::new(),
            host,
            correlator,
        }
    }

    /// Returns the owned message handle for a key, creating it at the host on
    /// first use.
    fn owned_handle(&self, key: ObjectKey) -> Option<MessageHandle> {
        if let Some(handle) = self.table.message_handle(key) {
            return Some(handle);
        }
        match self.host.create_message_handle(key.connection) {
            Ok(handle) => {
                debug!(key = %key, handle = %handle, "created message handle");
                self.table.record_message_handle(key, handle);
                Some(handle)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "could not create message handle");
                None
            }
        }
    }

    fn delete_handle(&self, conn: ConnectionHandle, handle: MessageHandle) {
        if let Err(err) = self.host.delete_message_handle(conn, handle) {
            warn!(conn = %conn, handle = %handle, error = %err, "could not delete message handle");
        }
    }

    /// Before-disconnect: tear down every piece of state held for the
    /// connection and release the message handles this exit created on it.
    pub fn disc_before(&self, conn: ConnectionHandle) {
        let handles = self.table.remove_connection(conn);
        debug!(conn = %conn, handles = handles.len(), "disconnect cleanup");
        for handle in handles {
            self.delete_handle(conn, handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::NoopCorrelator;
    use crate::domain::ObjectHandle;
    use crate::mqi::InMemoryHost;

    fn exit_with_host() -> (Arc<InMemoryHost>, ApiExit) {
        let host = Arc::new(InMemoryHost::new());
        let exit = ApiExit::new(Arc::clone(&host) as Arc<dyn HostServices>, Box::new(NoopCorrelator));
        (host, exit)
    }

    #[test]
    fn owned_handle_is_created_once_per_key() {
        let (host, exit) = exit_with_host();
        let conn = ConnectionHandle(1);
        let key = ObjectKey::new(conn, Some(ObjectHandle(2)));

        let first = exit.owned_handle(key).unwrap();
        let second = exit.owned_handle(key).unwrap();
        assert_eq!(first, second);
        assert_eq!(host.handle_count(conn), 1);

        // A different key on the same connection gets its own handle.
        let other = exit.owned_handle(ObjectKey::wildcard(conn)).unwrap();
        assert_ne!(first, other);
        assert_eq!(host.handle_count(conn), 2);
    }

    #[test]
    fn disconnect_releases_all_owned_handles() {
        let (host, exit) = exit_with_host();
        let conn = ConnectionHandle(1);
        let _ = exit.owned_handle(ObjectKey::wildcard(conn)).unwrap();
        let _ = exit
            .owned_handle(ObjectKey::new(conn, Some(ObjectHandle(2))))
            .unwrap();
        assert_eq!(host.handle_count(conn), 2);

        exit.disc_before(conn);
        assert_eq!(host.handle_count(conn), 0);

        // A second disconnect finds nothing and does not error.
        exit.disc_before(conn);
    }
}
