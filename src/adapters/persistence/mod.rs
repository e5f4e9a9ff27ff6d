//! Persistence Adapters - Relational Record Storage
//!
//! Implements the `RecordStore` port on SQLite via `rusqlite`.
//! The table layout lives in `StoreSchema`, built from configuration
//! and passed to the store when it is opened.

pub mod schema;
pub mod sqlite;

pub use schema::StoreSchema;
pub use sqlite::SqliteRecordStore;
