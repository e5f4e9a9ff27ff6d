//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain types with port interfaces to implement the
//! record API's operations.
//!
//! Use cases:
//! - `RecordService`: create/list/retrieve/update/delete with image upkeep

pub mod record_service;

pub use record_service::{CreateRecord, ImageChange, RecordService, UpdateRecord};
