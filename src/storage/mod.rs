//! Persistent storage for nexus-match.

pub mod sqlite;

pub use sqlite::SqliteCacheStore;
