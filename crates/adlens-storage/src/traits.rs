//! Blob storage abstraction trait
//!
//! This module defines the BlobStorage trait that storage backends implement.

use async_trait::async_trait;
use thiserror::Error;

/// Blob storage operation errors
#[derive(Debug, Error)]
pub enum BlobStorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob pathname: {0}")]
    InvalidPathname(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for blob storage operations
pub type BlobResult<T> = Result<T, BlobStorageError>;

/// Blob storage abstraction trait
///
/// Backends store opaque byte blobs under relative pathnames and serve them
/// back over the blob routes. Handlers work against this trait so tests can
/// inject a backend rooted in a temporary directory.
///
/// **Pathname format:** relative paths like `videos/demo.mp4`, no `..`
/// segments and no leading `/`. See the crate root documentation.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store a blob and return (pathname, public URL)
    ///
    /// The pathname is the stored relative path, the URL is where the blob
    /// can be fetched back from. Writing to an existing pathname replaces
    /// the previous blob.
    async fn put(
        &self,
        pathname: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> BlobResult<(String, String)>;

    /// Fetch a blob's bytes by pathname
    async fn get(&self, pathname: &str) -> BlobResult<Vec<u8>>;
}
