//! Store path conventions.

/// Root under which all snapshots live.
pub const PAYLOAD_ROOT: &str = "payload";

/// Location of one snapshot: `payload/{project}/{branch}/{commit_sha}`.
pub fn snapshot_path(project: &str, branch: &str, commit_sha: &str) -> String {
    format!("{}/{}/{}/{}", PAYLOAD_ROOT, project, branch, commit_sha)
}

/// Split a store path into its non-empty segments.
pub(crate) fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
