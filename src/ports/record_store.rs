//! Record Store Port - Durable Record Persistence Interface
//!
//! The store is the sole authority over persisted records. It owns
//! the date-uniqueness invariant and timestamp bookkeeping; callers
//! never pre-check for duplicates, they react to `DuplicateDate`.

use async_trait::async_trait;

use crate::domain::{NewRecord, Record, RecordError, RecordId, RecordPatch};

/// Trait for record persistence providers.
///
/// Implementations must enforce date uniqueness atomically: of two
/// concurrent writes targeting the same date, exactly one succeeds and
/// the other fails with `RecordError::DuplicateDate`.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Insert a record, assigning its id and both timestamps.
    ///
    /// # Errors
    /// `DuplicateDate` if another record holds `new.date`.
    async fn create(&self, new: NewRecord) -> Result<Record, RecordError>;

    /// All records, newest date first.
    async fn list(&self) -> Result<Vec<Record>, RecordError>;

    /// Fetch one record.
    ///
    /// # Errors
    /// `NotFound` if no record has this id.
    async fn get(&self, id: RecordId) -> Result<Record, RecordError>;

    /// Apply a patch, refreshing `updated_at` and keeping `created_at`.
    ///
    /// # Errors
    /// `NotFound` for an unknown id, `DuplicateDate` if the new date
    /// belongs to a different record.
    async fn update(&self, id: RecordId, patch: RecordPatch) -> Result<Record, RecordError>;

    /// Remove a record.
    ///
    /// # Errors
    /// `NotFound` if no record has this id.
    async fn delete(&self, id: RecordId) -> Result<(), RecordError>;

    /// Check if the backing database answers queries.
    async fn is_healthy(&self) -> bool;
}
