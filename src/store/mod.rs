//! Persistent user storage.
//! Used by: state.

pub mod sqlite;

pub use sqlite::SqliteUserStore;
