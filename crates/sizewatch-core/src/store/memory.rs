//! In-memory tree store.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{document, TreeStore};
use crate::error::SizeResult;

/// Tree store held entirely in process memory.
#[derive(Debug)]
pub struct MemoryTreeStore {
    doc: RwLock<Value>,
}

impl MemoryTreeStore {
    pub fn new() -> Self {
        Self {
            doc: RwLock::new(document::empty()),
        }
    }

    /// Copy of the whole document.
    pub async fn dump(&self) -> Value {
        self.doc.read().await.clone()
    }
}

impl Default for MemoryTreeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TreeStore for MemoryTreeStore {
    async fn write(&self, path: &str, value: Value) -> SizeResult<()> {
        let mut doc = self.doc.write().await;
        document::set(&mut doc, path, value);
        Ok(())
    }

    async fn read(&self, path: &str) -> SizeResult<Option<Value>> {
        let doc = self.doc.read().await;
        Ok(document::get(&doc, path).cloned())
    }

    async fn list_children(&self, path: &str) -> SizeResult<BTreeSet<String>> {
        let doc = self.doc.read().await;
        Ok(document::children(&doc, path))
    }
}
