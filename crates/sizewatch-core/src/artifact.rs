//! Build artifact model.

use serde::{Deserialize, Serialize};

use crate::error::{SizeError, SizeResult};

/// One build output file.
///
/// `full_path` is always `project_name` followed by `context_path`, joined by `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    /// Slash-delimited path as reported by the CI provider.
    pub full_path: String,

    /// First path segment.
    pub project_name: String,

    /// Remaining segments after the project name. Never empty.
    pub context_path: Vec<String>,

    /// Size in bytes.
    pub size_bytes: u64,
}

impl Artifact {
    /// Build an artifact from a CI path such as `aio/gzip7/inline`.
    pub fn from_path(full_path: impl Into<String>, size_bytes: u64) -> SizeResult<Self> {
        let full_path = full_path.into();
        let mut segments = full_path.split('/');

        let project_name = match segments.next() {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return Err(SizeError::InvalidArtifactPath { path: full_path }),
        };
        let context_path: Vec<String> = segments.map(String::from).collect();
        if context_path.is_empty() || context_path.iter().any(|s| s.is_empty()) {
            return Err(SizeError::InvalidArtifactPath { path: full_path });
        }

        Ok(Self {
            full_path,
            project_name,
            context_path,
            size_bytes,
        })
    }

    /// Build an artifact from a project and the segments below it.
    pub fn from_parts(
        project_name: impl Into<String>,
        context_path: Vec<String>,
        size_bytes: u64,
    ) -> Self {
        let project_name = project_name.into();
        let full_path = std::iter::once(project_name.as_str())
            .chain(context_path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("/");
        Self {
            full_path,
            project_name,
            context_path,
            size_bytes,
        }
    }
}

/// Comparison of one candidate artifact against its baseline counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifactDiff {
    /// The candidate artifact.
    pub artifact: Artifact,

    /// Candidate size minus baseline size; the full candidate size when the
    /// baseline has no artifact at that path. Negative for a decrease.
    pub increase: i64,
}

/// Commit metadata stored next to a snapshot's size tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    /// Commit message.
    pub message: String,

    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl CommitMeta {
    /// Metadata stamped with the current time.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
