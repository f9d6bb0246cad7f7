//! Per-commit artifact snapshots.
//!
//! Each (project, branch, commit) location holds one snapshot: the size tree
//! plus commit metadata stored alongside the tree root.
//!
//! ```json
//! {
//!   "change": "application",
//!   "message": "fix(core): drop unused export",
//!   "timestamp": 1700000000000,
//!   "gzip7": { "inline": 1200, "main": 5400 },
//!   "uncompressed": 9000
//! }
//! ```
//!
//! Saving overwrites the location wholesale; there is no history beyond the
//! last write per commit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::artifact::{Artifact, CommitMeta};
use crate::error::{SizeError, SizeResult};
use crate::store::{snapshot_path, TreeStore, PAYLOAD_ROOT};
use crate::tree::{self, ArtifactTree};

/// Value of the `change` metadata field.
pub const CHANGE_KIND: &str = "application";

/// Metadata keys that share the root object with the size tree.
pub const META_KEYS: [&str; 3] = ["change", "message", "timestamp"];

/// One stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub change: String,
    pub meta: CommitMeta,
    pub tree: ArtifactTree,
}

impl Snapshot {
    pub fn new(tree: ArtifactTree, meta: CommitMeta) -> Self {
        Self {
            change: CHANGE_KIND.to_string(),
            meta,
            tree,
        }
    }

    /// Serialize into the stored JSON object.
    pub fn to_value(&self) -> SizeResult<Value> {
        let mut object = match serde_json::to_value(&self.tree)? {
            Value::Object(map) => map,
            other => {
                return Err(SizeError::store(format!(
                    "size tree serialized to non-object: {}",
                    other
                )))
            }
        };
        if let Some(key) = META_KEYS.iter().find(|k| object.contains_key(**k)) {
            return Err(SizeError::ConflictingPath {
                path: key.to_string(),
            });
        }
        object.insert("change".to_string(), Value::from(self.change.clone()));
        object.insert("message".to_string(), Value::from(self.meta.message.clone()));
        object.insert("timestamp".to_string(), Value::from(self.meta.timestamp));
        Ok(Value::Object(object))
    }

    /// Parse a stored JSON object, separating metadata from the size tree.
    pub fn from_value(value: Value) -> SizeResult<Self> {
        let Value::Object(mut object) = value else {
            return Err(SizeError::store("snapshot is not an object"));
        };

        let change = take_string(&mut object, "change").unwrap_or_else(|| CHANGE_KIND.to_string());
        let message = take_string(&mut object, "message").unwrap_or_default();
        let timestamp = object
            .remove("timestamp")
            .and_then(|v| v.as_i64())
            .unwrap_or_default();

        let tree: ArtifactTree = serde_json::from_value(Value::Object(object))
            .map_err(|e| SizeError::store(format!("malformed size tree: {}", e)))?;

        Ok(Self {
            change,
            meta: CommitMeta { message, timestamp },
            tree,
        })
    }
}

fn take_string(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    match object.remove(key)? {
        Value::String(s) => Some(s),
        _ => None,
    }
}

/// Snapshot storage over a [`TreeStore`] handle.
#[derive(Clone)]
pub struct ArtifactStore {
    store: Arc<dyn TreeStore>,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore").finish_non_exhaustive()
    }
}

impl ArtifactStore {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &Arc<dyn TreeStore> {
        &self.store
    }

    /// Store `project`'s artifacts for one commit, replacing any prior snapshot.
    ///
    /// Artifacts of other projects are ignored. Nothing is written if the
    /// batch does not encode.
    pub async fn save(
        &self,
        project: &str,
        branch: &str,
        commit_sha: &str,
        artifacts: &[Artifact],
        meta: &CommitMeta,
    ) -> SizeResult<()> {
        let value = encode_snapshot(project, artifacts, meta)?;
        let path = snapshot_path(project, branch, commit_sha);
        self.store.write(&path, value).await?;
        debug!(project, branch, commit_sha, "saved snapshot");
        Ok(())
    }

    /// Store a whole build: every project found in `artifacts`, under every branch.
    ///
    /// All trees are encoded before the first write. Returns the projects stored.
    pub async fn save_build(
        &self,
        branches: &[String],
        commit_sha: &str,
        artifacts: &[Artifact],
        meta: &CommitMeta,
    ) -> SizeResult<Vec<String>> {
        let mut by_project: BTreeMap<&str, Vec<Artifact>> = BTreeMap::new();
        for artifact in artifacts {
            by_project
                .entry(artifact.project_name.as_str())
                .or_default()
                .push(artifact.clone());
        }

        let mut encoded = Vec::with_capacity(by_project.len());
        for (project, project_artifacts) in &by_project {
            encoded.push((*project, encode_snapshot(project, project_artifacts, meta)?));
        }

        for (project, value) in &encoded {
            for branch in branches {
                let path = snapshot_path(project, branch, commit_sha);
                self.store.write(&path, value.clone()).await?;
            }
        }

        let projects: Vec<String> = encoded.iter().map(|(p, _)| p.to_string()).collect();
        info!(
            commit_sha,
            projects = ?projects,
            branches = ?branches,
            "stored build artifacts"
        );
        Ok(projects)
    }

    /// Full snapshot at an exact commit, if one was stored.
    pub async fn load_snapshot(
        &self,
        project: &str,
        branch: &str,
        commit_sha: &str,
    ) -> SizeResult<Option<Snapshot>> {
        let path = snapshot_path(project, branch, commit_sha);
        match self.store.read(&path).await? {
            Some(value) => Snapshot::from_value(value).map(Some),
            None => Ok(None),
        }
    }

    /// Artifacts stored for `project` at exactly `commit_sha` on `branch`.
    ///
    /// No ancestor search: a branch head without a recorded push is `NotFound`.
    pub async fn load_for_ref(
        &self,
        project: &str,
        branch: &str,
        commit_sha: &str,
    ) -> SizeResult<Vec<Artifact>> {
        let snapshot = self
            .load_snapshot(project, branch, commit_sha)
            .await?
            .ok_or_else(|| SizeError::NotFound {
                project: project.to_string(),
                branch: branch.to_string(),
                commit: commit_sha.to_string(),
            })?;
        Ok(tree::decode(&snapshot.tree, project))
    }

    /// Every project with at least one stored snapshot.
    pub async fn list_projects(&self) -> SizeResult<BTreeSet<String>> {
        self.store.list_children(PAYLOAD_ROOT).await
    }

    /// Artifacts of all projects stored at `commit_sha` on `branch`.
    ///
    /// Projects without a snapshot at that commit are skipped; if none has
    /// one the result is `NotFound`.
    pub async fn load_target_branch(
        &self,
        branch: &str,
        commit_sha: &str,
    ) -> SizeResult<Vec<Artifact>> {
        let mut artifacts = Vec::new();
        let mut found = 0usize;

        for project in self.list_projects().await? {
            match self.load_for_ref(&project, branch, commit_sha).await {
                Ok(project_artifacts) => {
                    found += 1;
                    artifacts.extend(project_artifacts);
                }
                Err(SizeError::NotFound { .. }) => {
                    warn!(project = %project, branch, commit_sha, "project has no snapshot at target commit");
                }
                Err(e) => return Err(e),
            }
        }

        if found == 0 {
            return Err(SizeError::NotFound {
                project: "*".to_string(),
                branch: branch.to_string(),
                commit: commit_sha.to_string(),
            });
        }
        Ok(artifacts)
    }
}

fn encode_snapshot(project: &str, artifacts: &[Artifact], meta: &CommitMeta) -> SizeResult<Value> {
    let own: Vec<Artifact> = artifacts
        .iter()
        .filter(|a| a.project_name == project)
        .cloned()
        .collect();
    let tree = tree::encode(&own)?;
    Snapshot::new(tree, meta.clone())
        .to_value()
        .map_err(|e| match e {
            SizeError::ConflictingPath { path } => SizeError::ConflictingPath {
                path: format!("{}/{}", project, path),
            },
            other => other,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_value_carries_metadata() {
        let tree = tree::encode(&[Artifact::from_path("aio/gzip7/main", 10).unwrap()]).unwrap();
        let snapshot = Snapshot::new(
            tree,
            CommitMeta {
                message: "feat: x".to_string(),
                timestamp: 1_700_000_000_000,
            },
        );
        assert_eq!(
            snapshot.to_value().unwrap(),
            json!({
                "change": "application",
                "message": "feat: x",
                "timestamp": 1_700_000_000_000_i64,
                "gzip7": { "main": 10 }
            })
        );
    }

    #[test]
    fn test_from_value_strips_metadata() {
        let snapshot = Snapshot::from_value(json!({
            "change": "application",
            "message": "m",
            "timestamp": 5,
            "main": 100
        }))
        .unwrap();
        assert_eq!(snapshot.meta.timestamp, 5);
        assert_eq!(tree::decode(&snapshot.tree, "p"), vec![
            Artifact::from_path("p/main", 100).unwrap()
        ]);
    }

    #[test]
    fn test_reserved_root_segment_conflicts() {
        let artifacts = vec![Artifact::from_path("aio/message", 1).unwrap()];
        let err = encode_snapshot("aio", &artifacts, &CommitMeta::now("m")).unwrap_err();
        assert!(matches!(err, SizeError::ConflictingPath { path } if path == "aio/message"));
    }

    #[test]
    fn test_non_object_snapshot_is_store_error() {
        assert!(matches!(
            Snapshot::from_value(json!(12)),
            Err(SizeError::Store { .. })
        ));
        assert!(matches!(
            Snapshot::from_value(json!({ "main": "big" })),
            Err(SizeError::Store { .. })
        ));
    }
}
