//! Persisted analysis results.
//!
//! The whole list lives in one JSON file under the user's data directory.
//! Every mutation is a read-modify-rewrite of the full list, funneled
//! through a single async mutex so concurrent submission tasks cannot
//! interleave partial writes. A missing or unreadable file reads as an
//! empty list.

use std::path::{Path, PathBuf};

use adlens_core::models::{AnalysisItem, ItemState};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// File name of the persisted results list.
pub const STORE_FILE_NAME: &str = "saved-analysis-results.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Could not determine the user data directory")]
    NoDataDir,
    #[error("Results store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Results store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Single-writer store for the saved results list.
pub struct ResultsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ResultsStore {
    /// Store under `ADLENS_DATA_DIR`, defaulting to `~/.adlens`.
    pub fn open_default() -> Result<Self, StoreError> {
        let dir = match std::env::var("ADLENS_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir()
                .map(|home| home.join(".adlens"))
                .ok_or(StoreError::NoDataDir)?,
        };
        Ok(Self::at(dir.join(STORE_FILE_NAME)))
    }

    /// Store backed by an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All saved items, newest first.
    pub async fn list(&self) -> Result<Vec<AnalysisItem>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_items().await?;
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(items)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<AnalysisItem>, StoreError> {
        let _guard = self.lock.lock().await;
        let items = self.read_items().await?;
        Ok(items.into_iter().find(|item| item.id == id))
    }

    /// Insert a new item at the head of the list.
    pub async fn append(&self, item: AnalysisItem) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_items().await?;
        items.insert(0, item);
        self.write_items(&items).await
    }

    /// Replace the state of the item with `id`. Returns false when the id
    /// is unknown.
    pub async fn update_state(&self, id: Uuid, state: ItemState) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_items().await?;
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            return Ok(false);
        };
        item.state = state;
        self.write_items(&items).await?;
        Ok(true)
    }

    /// Remove the item with `id`. Returns false when the id is unknown.
    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_items().await?;
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Ok(false);
        }
        self.write_items(&items).await?;
        Ok(true)
    }

    /// Drop every saved item.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.write_items(&[]).await
    }

    async fn read_items(&self) -> Result<Vec<AnalysisItem>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        match serde_json::from_slice(&raw) {
            Ok(items) => Ok(items),
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %error,
                    "Results file is unreadable, treating it as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    async fn write_items(&self, items: &[AnalysisItem]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adlens_core::models::{ImageAnalysis, MediaAnalysis, MediaKind};
    use std::sync::Arc;

    fn store_in(dir: &tempfile::TempDir) -> ResultsStore {
        ResultsStore::at(dir.path().join(STORE_FILE_NAME))
    }

    fn item(name: &str) -> AnalysisItem {
        AnalysisItem::new(name, MediaKind::Image)
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_lists_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let first = item("first.png");
        let second = item("second.png");
        store.append(first.clone()).await.unwrap();
        store.append(second.clone()).await.unwrap();

        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, second.id);
        assert_eq!(items[1].id, first.id);
    }

    #[tokio::test]
    async fn test_update_state_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let record = item("photo.png");
        let id = record.id;
        store.append(record).await.unwrap();
        assert!(store.update_state(id, ItemState::Processing).await.unwrap());

        let reopened = store_in(&dir);
        let loaded = reopened.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.state, ItemState::Processing);
    }

    #[tokio::test]
    async fn test_update_state_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.append(item("photo.png")).await.unwrap();
        let updated = store
            .update_state(Uuid::new_v4(), ItemState::Processing)
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_completed_item_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let record = item("photo.png");
        let id = record.id;
        store.append(record).await.unwrap();

        let result = MediaAnalysis::Image(ImageAnalysis {
            description: "A red chair.".to_string(),
            ad_copy: vec!["Sit better.".to_string()],
            visual_elements: vec!["red chair".to_string()],
            claude_ad_copy: None,
        });
        store
            .update_state(id, ItemState::Completed { result: result.clone() })
            .await
            .unwrap();

        let loaded = store.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.state, ItemState::Completed { result });
    }

    #[tokio::test]
    async fn test_delete_removes_only_target() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let keep = item("keep.png");
        let doomed = item("doomed.png");
        store.append(keep.clone()).await.unwrap();
        store.append(doomed.clone()).await.unwrap();

        assert!(store.delete(doomed.id).await.unwrap());
        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, keep.id);

        assert!(!store.delete(doomed.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_empties_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.append(item("a.png")).await.unwrap();
        store.append(item("b.png")).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_empty_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE_NAME);
        std::fs::write(&path, b"not json{{{").unwrap();

        let store = ResultsStore::at(&path);
        assert!(store.list().await.unwrap().is_empty());

        store.append(item("photo.png")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_interleaved_appends_keep_every_item() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(item(&format!("photo-{i}.png"))).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 16);
    }
}
