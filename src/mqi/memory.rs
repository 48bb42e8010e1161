//! In-process implementation of the host services.
//!
//! [`InMemoryHost`] keeps message handles and their property bags in plain
//! maps, the way a queue manager's handle manager does, plus a small registry
//! of queue definitions so property-control inquiries can be answered. It
//! backs the crate's own tests and lets an embedding application exercise the
//! exit without a live queue manager.

use crate::domain::error::{ExitError, Result};
use crate::domain::{ConnectionHandle, MessageHandle, ObjectHandle};
use crate::mqi::host::{HostServices, InquiryTarget};
use crate::mqi::structures::PropertyControl;
use std::collections::HashMap;
use std::sync::Mutex;

/// Property bags held for one connection, keyed by message handle.
type HandleBags = HashMap<MessageHandle, HashMap<String, String>>;

#[derive(Default)]
struct HostState {
    /// Next handle value to allocate. Starts above zero so allocated handles
    /// are never mistaken for the sentinels.
    next_handle: i64,
    /// Live property bags per connection.
    connections: HashMap<ConnectionHandle, HandleBags>,
    /// Queue definitions: name → property-control attribute.
    queues: HashMap<String, PropertyControl>,
    /// Open objects: (connection, object) → queue name.
    objects: HashMap<(ConnectionHandle, ObjectHandle), String>,
}

/// In-memory host: a message-handle manager plus a queue registry.
pub struct InMemoryHost {
    state: Mutex<HostState>,
}

impl InMemoryHost {
    /// Creates an empty host with no queues defined.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState {
                next_handle: 1,
                ..HostState::default()
            }),
        }
    }

    /// Defines (or redefines) a queue with the given property-control
    /// attribute.
    pub fn define_queue(&self, name: &str, control: PropertyControl) {
        if let Ok(mut state) = self.state.lock() {
            state.queues.insert(name.to_string(), control);
        }
    }

    /// Associates an open object handle with a queue name, so inquiries by
    /// handle can be resolved.
    pub fn register_object(&self, conn: ConnectionHandle, obj: ObjectHandle, queue: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.objects.insert((conn, obj), queue.to_string());
        }
    }

    /// Reads a property directly, bypassing the trait. Test support.
    ///
    /// # Errors
    ///
    /// Returns an error when the handle is unknown.
    pub fn property(
        &self,
        conn: ConnectionHandle,
        handle: MessageHandle,
        name: &str,
    ) -> Result<Option<String>> {
        self.inquire_string_property(conn, handle, name)
    }

    /// Number of live handles on a connection. Test support.
    #[must_use]
    pub fn handle_count(&self, conn: ConnectionHandle) -> usize {
        self.state
            .lock()
            .map(|state| state.connections.get(&conn).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HostState>> {
        self.state
            .lock()
            .map_err(|e| ExitError::State(format!("host state poisoned: {e}")))
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostServices for InMemoryHost {
    fn create_message_handle(&self, conn: ConnectionHandle) -> Result<MessageHandle> {
        let mut state = self.lock()?;
        let handle = MessageHandle(state.next_handle);
        state.next_handle += 1;
        state
            .connections
            .entry(conn)
            .or_default()
            .insert(handle, HashMap::new());
        Ok(handle)
    }

    fn delete_message_handle(&self, conn: ConnectionHandle, handle: MessageHandle) -> Result<()> {
        let mut state = self.lock()?;
        let removed = state
            .connections
            .get_mut(&conn)
            .and_then(|bags| bags.remove(&handle));
        match removed {
            Some(_) => Ok(()),
            None => Err(ExitError::Host(format!(
                "delete: unknown handle {handle} on connection {conn}"
            ))),
        }
    }

    fn set_string_property(
        &self,
        conn: ConnectionHandle,
        handle: MessageHandle,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let bag = state
            .connections
            .get_mut(&conn)
            .and_then(|bags| bags.get_mut(&handle))
            .ok_or_else(|| {
                ExitError::Host(format!(
                    "set property: unknown handle {handle} on connection {conn}"
                ))
            })?;
        bag.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn inquire_string_property(
        &self,
        conn: ConnectionHandle,
        handle: MessageHandle,
        name: &str,
    ) -> Result<Option<String>> {
        let state = self.lock()?;
        let bag = state
            .connections
            .get(&conn)
            .and_then(|bags| bags.get(&handle))
            .ok_or_else(|| {
                ExitError::Host(format!(
                    "inquire property: unknown handle {handle} on connection {conn}"
                ))
            })?;
        Ok(bag.get(name).cloned())
    }

    fn inquire_property_control(
        &self,
        conn: ConnectionHandle,
        target: InquiryTarget<'_>,
    ) -> Result<PropertyControl> {
        let state = self.lock()?;
        let queue = match target {
            InquiryTarget::Object(obj) => state
                .objects
                .get(&(conn, obj))
                .ok_or_else(|| {
                    ExitError::Host(format!("inquire: object {obj} not open on {conn}"))
                })?
                .clone(),
            InquiryTarget::Name(od) => od.object_name.clone(),
        };
        state
            .queues
            .get(&queue)
            .copied()
            .ok_or_else(|| ExitError::Host(format!("inquire: queue {queue} not defined")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqi::structures::ObjectDescriptor;

    const CONN: ConnectionHandle = ConnectionHandle(1);

    #[test]
    fn handles_round_trip_properties() {
        let host = InMemoryHost::new();
        let handle = host.create_message_handle(CONN).unwrap();
        assert!(handle.is_valid());

        host.set_string_property(CONN, handle, "traceparent", "00-aa-bb-01")
            .unwrap();
        assert_eq!(
            host.inquire_string_property(CONN, handle, "traceparent")
                .unwrap()
                .as_deref(),
            Some("00-aa-bb-01")
        );
        assert_eq!(
            host.inquire_string_property(CONN, handle, "tracestate")
                .unwrap(),
            None
        );
    }

    #[test]
    fn delete_removes_handle() {
        let host = InMemoryHost::new();
        let handle = host.create_message_handle(CONN).unwrap();
        assert_eq!(host.handle_count(CONN), 1);

        host.delete_message_handle(CONN, handle).unwrap();
        assert_eq!(host.handle_count(CONN), 0);
        assert!(host.delete_message_handle(CONN, handle).is_err());
    }

    #[test]
    fn property_control_by_handle_and_by_name() {
        let host = InMemoryHost::new();
        host.define_queue("DEV.QUEUE.1", PropertyControl::None);
        host.register_object(CONN, ObjectHandle(7), "DEV.QUEUE.1");

        assert_eq!(
            host.inquire_property_control(CONN, InquiryTarget::Object(ObjectHandle(7)))
                .unwrap(),
            PropertyControl::None
        );

        let od = ObjectDescriptor {
            object_name: "DEV.QUEUE.1".to_string(),
            ..ObjectDescriptor::default()
        };
        assert_eq!(
            host.inquire_property_control(CONN, InquiryTarget::Name(&od))
                .unwrap(),
            PropertyControl::None
        );

        let od = ObjectDescriptor {
            object_name: "NO.SUCH.QUEUE".to_string(),
            ..ObjectDescriptor::default()
        };
        assert!(host
            .inquire_property_control(CONN, InquiryTarget::Name(&od))
            .is_err());
    }
}
