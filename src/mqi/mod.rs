//! Host interface layer: call structures, the host-services seam, and the
//! in-memory host used for tests and host-less embedding.

pub mod host;
pub mod memory;
pub mod structures;

pub use host::{HostServices, InquiryTarget};
pub use memory::InMemoryHost;
pub use structures::{
    CallbackContext, CallbackDescriptor, CallbackKind, CompCode, Completion, DeliveryCall,
    GetOptions, MessageDescriptor, ObjectDescriptor, ObjectType, OpenInput, OpenOptions,
    PropertyControl, PropertyOption, PutOptions, Reason, FORMAT_RF_HEADER_2, FORMAT_STRING,
};
