//! Correlation state shared between before- and after-callbacks.
//!
//! Every exit invocation is a single call into this crate; anything that must
//! survive from a before-callback to the matching after-callback, or from an
//! open to the gets that follow it, lives here. The table is keyed by
//! [`ObjectKey`] so unrelated connections and objects never see each other's
//! state.
//!
//! Locking is two-level: a table lock guards the map of connections, and each
//! connection carries its own lock for its object records. Exit callbacks for
//! different connections therefore never contend beyond the brief table
//! lookup.

use crate::domain::{ConnectionHandle, MessageHandle, ObjectHandle, ObjectKey};
use crate::mqi::structures::{GetOptions, PropertyControl, PutOptions};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// State kept for one object (or the connection-wide wildcard).
#[derive(Debug, Default)]
struct ObjectState {
    /// Message handle this crate created for the key, if any.
    owned_handle: Option<MessageHandle>,
    /// Property-control attribute discovered when the object was opened.
    property_control: Option<PropertyControl>,
    /// Put options replaced by a before-callback, awaiting restore.
    saved_put: Option<PutOptions>,
    /// Get options replaced by a before-callback, awaiting restore.
    saved_get: Option<GetOptions>,
}

#[derive(Debug, Default)]
struct ConnectionState {
    objects: HashMap<Option<ObjectHandle>, ObjectState>,
}

/// Table of per-connection correlation state.
///
/// All methods take `&self`; the table is meant to be shared across the host's
/// dispatch threads behind an `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: Mutex<HashMap<ConnectionHandle, Arc<Mutex<ConnectionState>>>>,
}

fn recover<T>(guard: std::sync::LockResult<MutexGuard<'_, T>>) -> MutexGuard<'_, T> {
    // A panic inside a short map update cannot leave the state half-written,
    // so a poisoned lock is still usable.
    guard.unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ConnectionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn connection(&self, conn: ConnectionHandle) -> Arc<Mutex<ConnectionState>> {
        let mut map = recover(self.connections.lock());
        Arc::clone(map.entry(conn).or_default())
    }

    fn with_object<R>(&self, key: ObjectKey, f: impl FnOnce(&mut ObjectState) -> R) -> R {
        let conn = self.connection(key.connection);
        let mut state = recover(conn.lock());
        f(state.objects.entry(key.object).or_default())
    }

    /// Returns the message handle this crate owns for the key, if one was
    /// recorded.
    #[must_use]
    pub fn message_handle(&self, key: ObjectKey) -> Option<MessageHandle> {
        self.with_object(key, |obj| obj.owned_handle)
    }

    /// Records a message handle this crate created for the key.
    pub fn record_message_handle(&self, key: ObjectKey, handle: MessageHandle) {
        self.with_object(key, |obj| obj.owned_handle = Some(handle));
    }

    /// Returns `true` when the given handle is one this crate created on the
    /// connection. Used by after-callbacks to decide whether the options they
    /// see were substituted by the matching before-callback.
    #[must_use]
    pub fn owns_handle(&self, conn: ConnectionHandle, handle: MessageHandle) -> bool {
        if !handle.is_valid() {
            return false;
        }
        let conn = self.connection(conn);
        let state = recover(conn.lock());
        state
            .objects
            .values()
            .any(|obj| obj.owned_handle == Some(handle))
    }

    /// Records the property-control attribute discovered for the key.
    pub fn set_property_control(&self, key: ObjectKey, control: PropertyControl) {
        self.with_object(key, |obj| obj.property_control = Some(control));
    }

    /// Returns the property-control attribute recorded for the key.
    #[must_use]
    pub fn property_control(&self, key: ObjectKey) -> Option<PropertyControl> {
        self.with_object(key, |obj| obj.property_control)
    }

    /// Stashes the caller's put options before substitution.
    pub fn save_put_options(&self, key: ObjectKey, options: PutOptions) {
        self.with_object(key, |obj| obj.saved_put = Some(options));
    }

    /// Takes the stashed put options, leaving nothing behind.
    #[must_use]
    pub fn take_put_options(&self, key: ObjectKey) -> Option<PutOptions> {
        self.with_object(key, |obj| obj.saved_put.take())
    }

    /// Stashes the caller's get options before substitution.
    pub fn save_get_options(&self, key: ObjectKey, options: GetOptions) {
        self.with_object(key, |obj| obj.saved_get = Some(options));
    }

    /// Takes the stashed get options, leaving nothing behind.
    #[must_use]
    pub fn take_get_options(&self, key: ObjectKey) -> Option<GetOptions> {
        self.with_object(key, |obj| obj.saved_get.take())
    }

    /// Drops all state for one object key, returning the owned message handle
    /// (if any) so the caller can delete it at the host.
    #[must_use]
    pub fn remove_object(&self, key: ObjectKey) -> Option<MessageHandle> {
        let conn = self.connection(key.connection);
        let mut state = recover(conn.lock());
        state
            .objects
            .remove(&key.object)
            .and_then(|obj| obj.owned_handle)
    }

    /// Drops all state for a connection, returning every owned message handle
    /// so the caller can delete them before the host tears the connection
    /// down.
    #[must_use]
    pub fn remove_connection(&self, conn: ConnectionHandle) -> Vec<MessageHandle> {
        let entry = {
            let mut map = recover(self.connections.lock());
            map.remove(&conn)
        };
        let Some(entry) = entry else {
            return Vec::new();
        };
        let mut state = recover(entry.lock());
        state
            .objects
            .drain()
            .filter_map(|(_, obj)| obj.owned_handle)
            .collect()
    }
}
