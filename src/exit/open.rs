//! Open and close interception.
//!
//! The only thing the exit wants from an open is the queue's property-control
//! attribute, because that attribute later decides whether a plain get would
//! silently discard message properties. The attribute is discovered once per
//! open and remembered under the (connection, object) key until close.

use super::ApiExit;
use crate::domain::{ConnectionHandle, ObjectHandle, ObjectKey};
use crate::mqi::structures::{CompCode, Completion, ObjectType, OpenOptions, PropertyControl};
use crate::mqi::{InquiryTarget, ObjectDescriptor};
use tracing::{debug, warn};

impl ApiExit {
    /// After-open: discover and stash the queue's property-control attribute.
    ///
    /// Runs only for queues opened with a real input option (browse does not
    /// count) and only when the open itself did not fail. When the caller
    /// opened with inquire, its own handle answers the inquiry; otherwise the
    /// host opens the queue by name behind the scenes. An inquiry failure is
    /// recorded as [`PropertyControl::Unknown`] and the exit moves on.
    pub fn open_after(
        &self,
        conn: ConnectionHandle,
        od: &ObjectDescriptor,
        options: OpenOptions,
        obj: ObjectHandle,
        completion: Completion,
    ) {
        if completion.code == CompCode::Failed {
            return;
        }
        if od.object_type != ObjectType::Queue || !options.for_input() {
            return;
        }

        let target = if options.inquire {
            InquiryTarget::Object(obj)
        } else {
            InquiryTarget::Name(od)
        };
        let control = match self.host.inquire_property_control(conn, target) {
            Ok(control) => control,
            Err(err) => {
                warn!(conn = %conn, queue = %od.object_name, error = %err,
                    "property-control inquiry failed");
                PropertyControl::Unknown
            }
        };

        let key = ObjectKey::new(conn, Some(obj));
        debug!(key = %key, queue = %od.object_name, ?control, "recorded property control");
        self.table.set_property_control(key, control);
    }

    /// After-close: drop everything remembered for the object and release the
    /// per-object message handle, if one was created for its gets.
    pub fn close_after(&self, conn: ConnectionHandle, obj: ObjectHandle) {
        let key = ObjectKey::new(conn, Some(obj));
        if let Some(handle) = self.table.remove_object(key) {
            self.delete_handle(conn, handle);
        }
    }
}
