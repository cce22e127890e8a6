use crate::traits::{BlobResult, BlobStorage, BlobStorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem blob storage implementation
#[derive(Clone)]
pub struct LocalBlobStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalBlobStorage {
    /// Create a new LocalBlobStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for blob storage (e.g., "data/blobs")
    /// * `base_url` - Base URL blobs are served from (e.g., "http://localhost:3000/api/blob")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> BlobResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            BlobStorageError::Config(format!(
                "Failed to create blob directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalBlobStorage {
            base_path,
            base_url,
        })
    }

    /// Convert blob pathname to filesystem path with security validation
    ///
    /// This function validates that the pathname doesn't contain path traversal
    /// sequences that could escape the base storage directory.
    fn pathname_to_path(&self, pathname: &str) -> BlobResult<PathBuf> {
        if pathname.is_empty() || pathname.contains("..") || pathname.starts_with('/') {
            return Err(BlobStorageError::InvalidPathname(
                "Blob pathname contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(pathname);

        if let Ok(canonical) = path.canonicalize() {
            let base_canonical = self.base_path.canonicalize().map_err(|e| {
                BlobStorageError::Config(format!("Failed to canonicalize base path: {}", e))
            })?;

            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(BlobStorageError::InvalidPathname(
                    "Blob pathname resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Generate public URL for a blob
    fn generate_url(&self, pathname: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), pathname)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> BlobResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn put(
        &self,
        pathname: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> BlobResult<(String, String)> {
        let path = self.pathname_to_path(pathname)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            BlobStorageError::WriteFailed(format!(
                "Failed to create file {}: {}",
                path.display(),
                e
            ))
        })?;

        file.write_all(&data).await.map_err(|e| {
            BlobStorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            BlobStorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let url = self.generate_url(pathname);

        tracing::info!(
            path = %path.display(),
            pathname = %pathname,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob write successful"
        );

        Ok((pathname.to_string(), url))
    }

    async fn get(&self, pathname: &str) -> BlobResult<Vec<u8>> {
        let path = self.pathname_to_path(pathname)?;
        let start = std::time::Instant::now();

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(BlobStorageError::NotFound(pathname.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            BlobStorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            pathname = %pathname,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob read successful"
        );

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "http://localhost:3000/api/blob".to_string())
            .await
            .unwrap();

        let data = b"test data".to_vec();

        let (pathname, url) = storage
            .put("videos/test.mp4", "video/mp4", data.clone())
            .await
            .unwrap();

        assert_eq!(pathname, "videos/test.mp4");
        assert_eq!(url, "http://localhost:3000/api/blob/videos/test.mp4");

        let downloaded = storage.get(&pathname).await.unwrap();
        assert_eq!(data, downloaded);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_blob() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "http://localhost:3000/api/blob".to_string())
            .await
            .unwrap();

        storage
            .put("image.png", "image/png", b"first".to_vec())
            .await
            .unwrap();
        storage
            .put("image.png", "image/png", b"second".to_vec())
            .await
            .unwrap();

        let downloaded = storage.get("image.png").await.unwrap();
        assert_eq!(downloaded, b"second".to_vec());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "http://localhost:3000/api/blob".to_string())
            .await
            .unwrap();

        let result = storage.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(BlobStorageError::InvalidPathname(_))));

        let result = storage.get("/etc/passwd").await;
        assert!(matches!(result, Err(BlobStorageError::InvalidPathname(_))));

        let result = storage
            .put("../escape.txt", "text/plain", b"x".to_vec())
            .await;
        assert!(matches!(result, Err(BlobStorageError::InvalidPathname(_))));
    }

    #[tokio::test]
    async fn test_get_missing_blob_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "http://localhost:3000/api/blob".to_string())
            .await
            .unwrap();

        let result = storage.get("nonexistent/file.mp4").await;
        assert!(matches!(result, Err(BlobStorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_creates_nested_directories() {
        let dir = tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "http://localhost:3000/api/blob/".to_string())
            .await
            .unwrap();

        let (_, url) = storage
            .put("a/b/c/deep.webp", "image/webp", b"deep".to_vec())
            .await
            .unwrap();

        // Trailing slash on the base URL must not double up
        assert_eq!(url, "http://localhost:3000/api/blob/a/b/c/deep.webp");
        assert!(dir.path().join("a/b/c/deep.webp").exists());
    }
}
