//! Domain layer for the mqotel exit.
//!
//! Holds the types shared by every other layer: the error type and `Result`
//! alias, and the typed handles that key the state table.

pub mod error;
pub mod handles;

pub use error::{ExitError, Result};
pub use handles::{ConnectionHandle, MessageHandle, ObjectHandle, ObjectKey};
