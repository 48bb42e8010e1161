//! Wire-adjacent codecs: the property carrier, traceparent parsing, and the
//! RFH2 header reader.

pub mod carrier;
pub mod rfh2;
pub mod traceparent;

pub use carrier::{PropertyCarrier, TRACEPARENT, TRACESTATE};
pub use traceparent::TraceParent;
