//! Record Service - Record Lifecycle Orchestration
//!
//! Sits between the HTTP layer and the two ports. Each API operation is
//! a single attempt against the store; the only extra work here is
//! keeping uploaded images in step with the rows that reference them.
//!
//! Asset and row writes are not transactional. Ordering:
//! - the payload is validated before anything is written
//! - the image is written first, then the row
//! - if the row write fails, the new image is removed best-effort
//! - after a committed replace/clear/delete, the old image is removed
//!   best-effort
//!
//! A failed best-effort removal is logged and leaves an orphaned file.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::domain::{
    ImageRef, NewRecord, Record, RecordError, RecordId, RecordPatch, normalize_memo,
};
use crate::ports::{BlobStore, RecordStore, Upload};

/// Validated input for creating a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRecord {
    pub date: NaiveDate,
    pub memo: Option<String>,
    pub image: Option<Upload>,
}

/// What an update does to the stored image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageChange {
    /// Leave the current image as it is.
    #[default]
    Keep,
    /// Drop the reference (and the file).
    Clear,
    /// Store a new upload in place of the current image.
    Replace(Upload),
}

/// Validated input for updating a record. `None` fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRecord {
    pub date: Option<NaiveDate>,
    pub memo: Option<String>,
    pub image: ImageChange,
}

/// Orchestrates record operations over a store and a blob area.
pub struct RecordService<S: RecordStore, B: BlobStore> {
    /// Record persistence port.
    store: Arc<S>,
    /// Image storage port.
    blobs: Arc<B>,
}

impl<S: RecordStore, B: BlobStore> RecordService<S, B> {
    /// Create a new record service.
    pub fn new(store: Arc<S>, blobs: Arc<B>) -> Self {
        Self { store, blobs }
    }

    /// All records, newest date first.
    pub async fn list(&self) -> Result<Vec<Record>, RecordError> {
        self.store.list().await
    }

    pub async fn get(&self, id: RecordId) -> Result<Record, RecordError> {
        self.store.get(id).await
    }

    /// Create a record, storing its image first if one was uploaded.
    #[instrument(skip(self, input), fields(date = %input.date))]
    pub async fn create(&self, input: CreateRecord) -> Result<Record, RecordError> {
        let image = match &input.image {
            Some(upload) => Some(self.blobs.save(upload).await?),
            None => None,
        };

        let mut new = NewRecord::new(input.date).with_memo(input.memo.unwrap_or_default());
        new.image.clone_from(&image);

        match self.store.create(new).await {
            Ok(record) => {
                info!(id = %record.id, has_image = record.image.is_some(), "Record created");
                Ok(record)
            }
            Err(e) => {
                if let Some(image) = image {
                    self.discard(&image).await;
                }
                Err(e)
            }
        }
    }

    /// Update a record. Unknown ids fail before any image is written.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: RecordId, input: UpdateRecord) -> Result<Record, RecordError> {
        let current = self.store.get(id).await?;

        let (image_patch, new_image) = match &input.image {
            ImageChange::Keep => (None, None),
            ImageChange::Clear => (Some(None), None),
            ImageChange::Replace(upload) => {
                let image = self.blobs.save(upload).await?;
                (Some(Some(image.clone())), Some(image))
            }
        };

        let patch = RecordPatch {
            date: input.date,
            memo: input.memo.map(|m| normalize_memo(Some(m))),
            image: image_patch,
        };
        let touches_image = patch.touches_image();

        match self.store.update(id, patch).await {
            Ok(record) => {
                if touches_image {
                    if let Some(old) = current.image.filter(|old| record.image.as_ref() != Some(old)) {
                        self.discard(&old).await;
                    }
                }
                info!(%id, "Record updated");
                Ok(record)
            }
            Err(e) => {
                if let Some(image) = new_image {
                    self.discard(&image).await;
                }
                Err(e)
            }
        }
    }

    /// Delete a record and, best-effort, its image.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: RecordId) -> Result<(), RecordError> {
        let current = self.store.get(id).await?;
        self.store.delete(id).await?;

        if let Some(image) = current.image {
            self.discard(&image).await;
        }
        info!(%id, "Record deleted");
        Ok(())
    }

    /// Both the store and the blob area are usable.
    pub async fn is_healthy(&self) -> bool {
        self.store.is_healthy().await && self.blobs.is_healthy().await
    }

    /// Best-effort image removal; failures leave an orphan.
    async fn discard(&self, image: &ImageRef) {
        if let Err(e) = self.blobs.delete(image).await {
            warn!(image = %image, error = %e, "Failed to remove image, leaving orphan");
        }
    }
}
