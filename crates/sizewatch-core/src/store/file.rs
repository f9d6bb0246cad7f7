//! Single-file JSON tree store.
//!
//! The whole document is held in memory and written back atomically
//! (temp file + rename) after every write. One process owns the file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{document, TreeStore};
use crate::error::{SizeError, SizeResult};

/// Tree store persisted as one JSON file.
#[derive(Debug)]
pub struct FileTreeStore {
    path: PathBuf,
    doc: Mutex<Value>,
}

impl FileTreeStore {
    /// Open the store at `path`, starting empty when the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> SizeResult<Self> {
        let path = path.into();
        let doc = match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => document::empty(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                SizeError::store(format!("failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => document::empty(),
            Err(e) => {
                return Err(SizeError::store(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        debug!(path = %path.display(), "opened file store");
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn write_atomic(path: &Path, content: &str) -> SizeResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| SizeError::store(format!("failed to create store directory: {}", e)))?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)
        .await
        .map_err(|e| SizeError::store(format!("failed to write temp file: {}", e)))?;
    fs::rename(&temp_path, path)
        .await
        .map_err(|e| SizeError::store(format!("failed to rename temp file: {}", e)))?;
    Ok(())
}

#[async_trait]
impl TreeStore for FileTreeStore {
    async fn write(&self, path: &str, value: Value) -> SizeResult<()> {
        let mut doc = self.doc.lock().await;

        // Persist first so a failed write leaves the in-memory view untouched.
        let mut next = doc.clone();
        document::set(&mut next, path, value);
        let content = serde_json::to_string_pretty(&next)?;
        write_atomic(&self.path, &content).await?;
        *doc = next;

        debug!(store = %self.path.display(), path, "wrote tree node");
        Ok(())
    }

    async fn read(&self, path: &str) -> SizeResult<Option<Value>> {
        let doc = self.doc.lock().await;
        Ok(document::get(&doc, path).cloned())
    }

    async fn list_children(&self, path: &str) -> SizeResult<BTreeSet<String>> {
        let doc = self.doc.lock().await;
        Ok(document::children(&doc, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        let store = FileTreeStore::open(&path).await.unwrap();
        store
            .write("payload/aio/main/abc", json!({ "main": 42 }))
            .await
            .unwrap();
        drop(store);

        let reopened = FileTreeStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.read("payload/aio/main/abc").await.unwrap(),
            Some(json!({ "main": 42 }))
        );
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_store_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = FileTreeStore::open(&path).await;
        assert!(matches!(result, Err(SizeError::Store { .. })));
    }

    #[tokio::test]
    async fn test_empty_file_opens_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        std::fs::write(&path, "").unwrap();

        let store = FileTreeStore::open(&path).await.unwrap();
        assert!(store.list_children("payload").await.unwrap().is_empty());
    }
}
