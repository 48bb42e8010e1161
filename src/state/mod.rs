//! Cross-callback correlation state.

pub mod table;

pub use table::ConnectionTable;
