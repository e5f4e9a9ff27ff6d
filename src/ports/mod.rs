//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the record service requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `RecordStore`: Durable record rows under the date-uniqueness rule
//! - `BlobStore`: Uploaded image bytes addressed by generated path

pub mod blob_store;
pub mod record_store;

pub use blob_store::{BlobStore, Upload};
pub use record_store::RecordStore;
