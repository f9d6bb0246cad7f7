//! CI status event payload.
//!
//! The subset of a GitHub `status` webhook the gate reads.

use serde::{Deserialize, Serialize};

use crate::verdict::StatusState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Commit the status was posted for.
    pub sha: String,

    pub state: StatusState,

    /// Status context, e.g. `ci/circleci: build`.
    pub context: String,

    /// Link to the CI build.
    #[serde(default)]
    pub target_url: Option<String>,

    pub repository: Repository,

    /// Branches whose head is this commit.
    #[serde(default)]
    pub branches: Vec<BranchRef>,

    pub commit: CommitInfo,
}

impl StatusEvent {
    pub fn owner(&self) -> &str {
        &self.repository.owner.login
    }

    pub fn repo(&self) -> &str {
        &self.repository.name
    }

    pub fn branch_names(&self) -> Vec<String> {
        self.branches.iter().map(|b| b.name.clone()).collect()
    }

    pub fn commit_message(&self) -> &str {
        &self.commit.commit.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub owner: Owner,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.login, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
}
