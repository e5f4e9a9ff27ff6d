//! Blob Adapters - Filesystem Image Storage
//!
//! Implements the `BlobStore` port on a local directory tree. The same
//! directory is served read-only under the media URL by the HTTP layer.

pub mod local;

pub use local::LocalBlobStore;
