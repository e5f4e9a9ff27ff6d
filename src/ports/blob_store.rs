//! Blob Store Port - Uploaded Image Storage Interface
//!
//! Images are written before the row that references them; see
//! `usecases::record_service` for the cleanup rules when the row write
//! fails. A blob store never interprets the bytes it is given.

use async_trait::async_trait;

use crate::domain::ImageRef;

/// An uploaded file as received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Client-side file name, used only for its extension.
    pub file_name: Option<String>,
    /// Declared MIME type; names the extension when the file name has none.
    pub content_type: Option<String>,
    /// Raw file content. Never empty once validated.
    pub bytes: Vec<u8>,
}

/// Trait for binary asset storage.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Persist an upload under a freshly generated path.
    async fn save(&self, upload: &Upload) -> anyhow::Result<ImageRef>;

    /// Remove a stored asset. Deleting a missing asset is not an error.
    async fn delete(&self, image: &ImageRef) -> anyhow::Result<()>;

    /// Check if the storage area is writable.
    async fn is_healthy(&self) -> bool;
}
