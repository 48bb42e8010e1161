//! Host services abstraction.
//!
//! The exit cannot manage message handles or properties itself; those live
//! inside the queue manager. This module defines the [`HostServices`] trait
//! that abstracts the handful of host calls the propagation logic needs
//! (create/delete handle, set/inquire a string property, inquire the
//! property-control attribute). The embedding host shim implements it over the
//! real vendor entry points; [`InMemoryHost`](crate::mqi::InMemoryHost)
//! implements it in-process for tests and host-less embedding.
//!
//! The trait is deliberately minimal: each method maps to exactly one host
//! verb the propagation logic issues, nothing speculative.

use crate::domain::error::Result;
use crate::domain::{ConnectionHandle, MessageHandle, ObjectHandle};
use crate::mqi::structures::{ObjectDescriptor, PropertyControl};

/// How to address a property-control inquiry.
///
/// When the application opened the queue with the inquire option, its own
/// handle can be reused; otherwise the host has to open the queue by name,
/// inquire, and close it again behind the scenes.
#[derive(Debug, Clone, Copy)]
pub enum InquiryTarget<'a> {
    /// Inquire through an already-open object handle.
    Object(ObjectHandle),
    /// Open by name for inquiry, then close.
    Name(&'a ObjectDescriptor),
}

/// Abstraction over the host's handle and property services.
///
/// Implementations must be safe to call from any of the host's dispatch
/// threads. Calls made by the exit through this trait are not re-entered into
/// the exit by the host.
pub trait HostServices: Send + Sync {
    /// Creates a new message handle on the given connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the host rejects the request, for example because
    /// the connection handle is no longer valid.
    fn create_message_handle(&self, conn: ConnectionHandle) -> Result<MessageHandle>;

    /// Deletes a message handle previously created on the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown to the host.
    fn delete_message_handle(&self, conn: ConnectionHandle, handle: MessageHandle) -> Result<()>;

    /// Sets a string property on a message handle, replacing any existing
    /// value under the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown or the host rejects the
    /// property.
    fn set_string_property(
        &self,
        conn: ConnectionHandle,
        handle: MessageHandle,
        name: &str,
        value: &str,
    ) -> Result<()>;

    /// Reads a string property from a message handle.
    ///
    /// Returns `Ok(None)` when the property does not exist, which is an
    /// expected outcome, not an error. Host failures (bad handle, conversion
    /// problems) are errors.
    ///
    /// # Errors
    ///
    /// Returns an error for any host failure other than "property not
    /// available".
    fn inquire_string_property(
        &self,
        conn: ConnectionHandle,
        handle: MessageHandle,
        name: &str,
    ) -> Result<Option<String>>;

    /// Discovers the property-control attribute of a queue.
    ///
    /// # Errors
    ///
    /// Returns an error when the inquiry cannot be made; callers record
    /// [`PropertyControl::Unknown`] and continue.
    fn inquire_property_control(
        &self,
        conn: ConnectionHandle,
        target: InquiryTarget<'_>,
    ) -> Result<PropertyControl>;
}
