//! Path tree codec.
//!
//! Converts between a flat artifact list and the nested tree stored per
//! snapshot. Each artifact's `context_path` is a root-to-leaf walk; the leaf
//! holds the byte size.
//!
//! ```text
//! aio/gzip7/inline  1200          gzip7
//! aio/gzip7/main    5400   <=>      inline: 1200
//! aio/uncompressed  9000            main: 5400
//!                                 uncompressed: 9000
//! ```
//!
//! A segment can never be both a leaf and a branch. Encoding rejects such a
//! batch with [`SizeError::ConflictingPath`] instead of overwriting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::error::{SizeError, SizeResult};

/// One node of a size tree.
///
/// Serializes as a bare integer (leaf) or a JSON object (branch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Leaf(u64),
    Branch(BTreeMap<String, TreeNode>),
}

/// Size tree for one (project, branch, commit) snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactTree {
    root: BTreeMap<String, TreeNode>,
}

impl ArtifactTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_root(root: BTreeMap<String, TreeNode>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &BTreeMap<String, TreeNode> {
        &self.root
    }

    pub fn into_root(self) -> BTreeMap<String, TreeNode> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count() == 0
    }

    /// Number of artifacts held by the tree.
    pub fn leaf_count(&self) -> usize {
        fn count(level: &BTreeMap<String, TreeNode>) -> usize {
            level
                .values()
                .map(|node| match node {
                    TreeNode::Leaf(_) => 1,
                    TreeNode::Branch(children) => count(children),
                })
                .sum()
        }
        count(&self.root)
    }

    /// Insert one artifact, creating intermediate branches as needed.
    ///
    /// A repeated path replaces the earlier size.
    pub fn insert(&mut self, artifact: &Artifact) -> SizeResult<()> {
        let conflict = || SizeError::ConflictingPath {
            path: artifact.full_path.clone(),
        };

        let Some((leaf, parents)) = artifact.context_path.split_last() else {
            return Err(SizeError::InvalidArtifactPath {
                path: artifact.full_path.clone(),
            });
        };

        let mut level = &mut self.root;
        for segment in parents {
            let node = level
                .entry(segment.clone())
                .or_insert_with(|| TreeNode::Branch(BTreeMap::new()));
            level = match node {
                TreeNode::Branch(children) => children,
                TreeNode::Leaf(_) => return Err(conflict()),
            };
        }

        match level.get_mut(leaf) {
            Some(TreeNode::Branch(_)) => Err(conflict()),
            Some(TreeNode::Leaf(size)) => {
                *size = artifact.size_bytes;
                Ok(())
            }
            None => {
                level.insert(leaf.clone(), TreeNode::Leaf(artifact.size_bytes));
                Ok(())
            }
        }
    }
}

/// Encode artifacts into a size tree.
///
/// All artifacts must belong to one project; the project segment is not part
/// of the tree. An artifact from another project is rejected as an invalid path.
pub fn encode(artifacts: &[Artifact]) -> SizeResult<ArtifactTree> {
    let mut tree = ArtifactTree::new();
    let project = artifacts.first().map(|a| a.project_name.as_str());
    for artifact in artifacts {
        if Some(artifact.project_name.as_str()) != project {
            return Err(SizeError::InvalidArtifactPath {
                path: artifact.full_path.clone(),
            });
        }
        tree.insert(artifact)?;
    }
    Ok(tree)
}

/// Decode a size tree back into artifacts of `project_name`.
///
/// Output order follows the tree's key order; callers must not rely on it.
pub fn decode(tree: &ArtifactTree, project_name: &str) -> Vec<Artifact> {
    let mut artifacts = Vec::with_capacity(tree.leaf_count());
    let mut path = Vec::new();
    walk(&tree.root, project_name, &mut path, &mut artifacts);
    artifacts
}

fn walk(
    level: &BTreeMap<String, TreeNode>,
    project_name: &str,
    path: &mut Vec<String>,
    out: &mut Vec<Artifact>,
) {
    for (segment, node) in level {
        path.push(segment.clone());
        match node {
            TreeNode::Leaf(size) => {
                out.push(Artifact::from_parts(project_name, path.clone(), *size));
            }
            TreeNode::Branch(children) => walk(children, project_name, path, out),
        }
        path.pop();
    }
}
