//! Backing tree store.
//!
//! A JSON document store addressed by slash-delimited paths, with the
//! semantics of a realtime tree database: writing a path replaces the whole
//! subtree there, reading a missing path yields `None`, and listing returns
//! the keys directly below a path.
//!
//! # Key Schema
//!
//! ```text
//! payload/{project}/{branch}/{commit_sha}   # one snapshot
//! ```
//!
//! # Backends
//!
//! ```text
//! memory://                         # in-process, for tests
//! file:///var/lib/sizewatch.json    # single JSON document on disk
//! https://my-db.firebaseio.com      # Realtime Database REST API
//! ```

mod document;
pub mod file;
pub mod memory;
pub mod naming;
pub mod rtdb;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{SizeError, SizeResult};

pub use file::FileTreeStore;
pub use memory::MemoryTreeStore;
pub use naming::{snapshot_path, PAYLOAD_ROOT};
pub use rtdb::RealtimeDbStore;

/// Tree-structured key-value store.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Replace the value at `path` entirely. Writing `Null` deletes it.
    async fn write(&self, path: &str, value: Value) -> SizeResult<()>;

    /// Read the value at `path`.
    async fn read(&self, path: &str) -> SizeResult<Option<Value>>;

    /// Keys of the object at `path`; empty when missing or not an object.
    async fn list_children(&self, path: &str) -> SizeResult<BTreeSet<String>>;
}

/// Parsed store specification from CLI/config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSpec {
    Memory,
    File(String),
    RealtimeDb(String),
}

impl StoreSpec {
    /// Parse a store URL like `file:///path/store.json` or `https://db.example.com`.
    pub fn parse(spec: &str) -> SizeResult<Self> {
        if spec.starts_with("memory://") {
            return Ok(Self::Memory);
        }
        if let Some(path) = spec.strip_prefix("file://") {
            if path.is_empty() {
                return Err(SizeError::Config {
                    message: format!("store spec '{}' has no file path", spec),
                });
            }
            return Ok(Self::File(path.to_string()));
        }
        if spec.starts_with("https://") || spec.starts_with("http://") {
            return Ok(Self::RealtimeDb(spec.to_string()));
        }
        Err(SizeError::Config {
            message: format!("unsupported store spec: {}", spec),
        })
    }
}

/// Open the store described by `spec`.
pub async fn open_store(
    spec: &StoreSpec,
    token: Option<String>,
    timeout_secs: u64,
) -> SizeResult<Arc<dyn TreeStore>> {
    let store: Arc<dyn TreeStore> = match spec {
        StoreSpec::Memory => Arc::new(MemoryTreeStore::new()),
        StoreSpec::File(path) => Arc::new(FileTreeStore::open(path).await?),
        StoreSpec::RealtimeDb(url) => Arc::new(RealtimeDbStore::new(url, token, timeout_secs)?),
    };
    Ok(store)
}
