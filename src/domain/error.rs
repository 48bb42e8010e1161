//! Error types for the mqotel exit.
//!
//! This module defines the centralized error type [`ExitError`] and a type alias
//! [`Result`] for convenient error handling throughout the exit. All errors are
//! implemented using the `thiserror` crate for automatic `Error` trait
//! implementation.
//!
//! Almost nothing in this crate treats an error as fatal: the exit's contract
//! with its host is to degrade to pass-through behavior, so most call sites log
//! the error and return the caller's structures unmodified.

use thiserror::Error;

/// The main error type for exit operations.
///
/// This enum consolidates the error conditions that can occur while the exit
/// is intercepting host calls: host service failures, file I/O problems, and
/// unusable internal state.
#[derive(Debug, Error)]
pub enum ExitError {
    /// A host service call (handle or property operation) failed.
    ///
    /// The string carries the verb and the host's completion/reason information
    /// in display form, mirroring how the host reports its own errors.
    #[error("Host call failed: {0}")]
    Host(String),

    /// Filesystem or I/O operation failed.
    ///
    /// Wraps errors from standard library I/O operations (log files, trace
    /// export). Automatically converts from `std::io::Error`.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal state became unusable, typically a poisoned lock.
    ///
    /// This is the closest the exit gets to a fatal condition; callers still
    /// surface it as a warning and fall back to pass-through.
    #[error("State error: {0}")]
    State(String),
}

/// A specialized `Result` type for exit operations.
pub type Result<T> = std::result::Result<T, ExitError>;
