//! Local Blob Store - Uploaded Images on the Filesystem
//!
//! Saves each upload as `{upload_dir}/{uuid}.{ext}` below the media
//! root using atomic writes (write to a dot-prefixed tmp file, then
//! rename), so a reader never observes a half-written image.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::ImageRef;
use crate::ports::{BlobStore, Upload};

/// Written and removed by the readiness check. Dot-files under the media
/// root are never served.
const HEALTH_CHECK_FILE: &str = ".health_check";

/// Longest file extension carried over from the client's file name.
const MAX_EXTENSION_LEN: usize = 10;

/// Filesystem-backed blob store.
pub struct LocalBlobStore {
    /// Media root; image refs are relative to it.
    root: PathBuf,
    /// Subdirectory new uploads are written to.
    upload_dir: String,
}

impl LocalBlobStore {
    /// Create a blob store rooted at `root`.
    ///
    /// Creates `root/upload_dir` if it doesn't exist.
    pub async fn new(root: impl Into<PathBuf>, upload_dir: &str) -> Result<Self> {
        let root = root.into();
        let dir = root.join(upload_dir);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

        info!(root = %root.display(), upload_dir, "Blob store ready");

        Ok(Self {
            root,
            upload_dir: upload_dir.to_string(),
        })
    }

    /// Media root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a stored image.
    ///
    /// Refs that would escape the root (absolute, `..`) are rejected.
    pub fn path_of(&self, image: &ImageRef) -> Result<PathBuf> {
        let rel = Path::new(image.as_str());
        anyhow::ensure!(
            rel.components().all(|c| matches!(c, Component::Normal(_))),
            "Image path escapes media root: {image}"
        );
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    #[instrument(skip(self, upload), fields(size = upload.bytes.len()))]
    async fn save(&self, upload: &Upload) -> Result<ImageRef> {
        let ext = extension_of(upload.file_name.as_deref())
            .or_else(|| extension_for_mime(upload.content_type.as_deref()));
        let name = match ext {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };
        let image = ImageRef::new(format!("{}/{name}", self.upload_dir));

        let path = self.path_of(&image)?;
        let tmp_path = path.with_file_name(format!(".{name}.tmp"));
        write_atomic(&tmp_path, &path, &upload.bytes).await?;

        debug!(image = %image, "Image stored");
        Ok(image)
    }

    #[instrument(skip(self), fields(image = %image))]
    async fn delete(&self, image: &ImageRef) -> Result<()> {
        let path = self.path_of(image)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Image removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    /// Check the media root is writable and the upload directory exists.
    async fn is_healthy(&self) -> bool {
        let test_path = self.root.join(HEALTH_CHECK_FILE);
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;

        let upload_dir = fs::metadata(self.root.join(&self.upload_dir)).await;
        result.is_ok() && upload_dir.is_ok_and(|m| m.is_dir())
    }
}

/// Write to a tmp file, then rename it into place. The tmp file is
/// removed if either step fails.
async fn write_atomic(tmp_path: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let result: Result<()> = async {
        fs::write(tmp_path, bytes)
            .await
            .context("Failed to write tmp image file")?;
        fs::rename(tmp_path, path)
            .await
            .context("Failed to rename image file")
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(tmp_path).await;
    }
    result
}

/// Extension for a declared image MIME type, used when the file name
/// carries none.
fn extension_for_mime(content_type: Option<&str>) -> Option<String> {
    let essence = content_type?.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match essence.as_str() {
        "image/jpeg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/heif" => "heif",
        "image/bmp" => "bmp",
        _ => return None,
    };
    Some(ext.to_string())
}

/// Lowercased extension of the client file name, if it is a short
/// alphanumeric suffix.
fn extension_of(file_name: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?).extension()?.to_str()?;
    let usable = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    usable.then(|| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn upload(name: Option<&str>, bytes: &[u8]) -> Upload {
        Upload {
            file_name: name.map(str::to_string),
            content_type: Some("image/png".to_string()),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_save_writes_under_upload_dir() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path(), "skin_records").await.unwrap();

        let image = store.save(&upload(Some("Face.PNG"), b"\x89PNG")).await.unwrap();
        assert!(image.as_str().starts_with("skin_records/"));
        assert!(image.as_str().ends_with(".png"));

        let data = fs::read(store.path_of(&image).unwrap()).await.unwrap();
        assert_eq!(data, b"\x89PNG");
    }

    #[tokio::test]
    async fn test_generated_paths_are_unique() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path(), "skin_records").await.unwrap();

        let a = store.save(&upload(Some("same.jpg"), b"a")).await.unwrap();
        let b = store.save(&upload(Some("same.jpg"), b"b")).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path(), "skin_records").await.unwrap();

        let image = store.save(&upload(None, b"bytes")).await.unwrap();
        let path = store.path_of(&image).unwrap();
        assert!(path.exists());

        store.delete(&image).await.unwrap();
        assert!(!path.exists());
        store.delete(&image).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_escaping_refs() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path(), "skin_records").await.unwrap();

        assert!(store.path_of(&ImageRef::new("../etc/passwd")).is_err());
        assert!(store.delete(&ImageRef::new("/etc/passwd")).await.is_err());
    }

    #[tokio::test]
    async fn test_is_healthy() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path(), "skin_records").await.unwrap();
        assert!(store.is_healthy().await);
        assert!(!temp.path().join(HEALTH_CHECK_FILE).exists());
        assert!(!temp.path().join("skin_records").join(HEALTH_CHECK_FILE).exists());

        fs::remove_dir(temp.path().join("skin_records")).await.unwrap();
        assert!(!store.is_healthy().await);
    }

    #[tokio::test]
    async fn test_failed_rename_removes_tmp_file() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("taken");
        fs::create_dir(&target).await.unwrap();
        fs::write(target.join("occupant"), b"x").await.unwrap();
        let tmp = temp.path().join(".taken.tmp");

        assert!(write_atomic(&tmp, &target, b"bytes").await.is_err());
        assert!(!tmp.exists());
        assert!(target.join("occupant").exists());
    }

    #[tokio::test]
    async fn test_save_leaves_only_the_final_file() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path(), "skin_records").await.unwrap();
        let image = store.save(&upload(Some("a.png"), b"png")).await.unwrap();

        let mut names = Vec::new();
        let mut entries = fs::read_dir(temp.path().join("skin_records")).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names.len(), 1);
        assert!(image.as_str().ends_with(&names[0]));
    }

    #[tokio::test]
    async fn test_content_type_supplies_missing_extension() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path(), "skin_records").await.unwrap();

        let mut blob = upload(Some("camera-capture"), b"jpeg");
        blob.content_type = Some("image/jpeg".to_string());
        assert!(store.save(&blob).await.unwrap().as_str().ends_with(".jpg"));

        // The file name's own extension wins.
        let mut blob = upload(Some("scan.png"), b"png");
        blob.content_type = Some("image/jpeg".to_string());
        assert!(store.save(&blob).await.unwrap().as_str().ends_with(".png"));
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime(Some("IMAGE/PNG")).as_deref(), Some("png"));
        assert_eq!(extension_for_mime(Some("image/jpeg; charset=binary")).as_deref(), Some("jpg"));
        assert_eq!(extension_for_mime(Some("application/octet-stream")), None);
        assert_eq!(extension_for_mime(None), None);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Some("a.JPG")).as_deref(), Some("jpg"));
        assert_eq!(extension_of(Some("archive.tar.gz")).as_deref(), Some("gz"));
        assert_eq!(extension_of(Some("noext")), None);
        assert_eq!(extension_of(Some("weird.p$g")), None);
        assert_eq!(extension_of(None), None);
    }
}
