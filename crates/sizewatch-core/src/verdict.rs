//! Gate verdict classification.

use serde::{Deserialize, Serialize};

use crate::artifact::BuildArtifactDiff;

/// Commit status state as understood by the source-control host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Pending,
    Success,
    Failure,
    Error,
}

impl StatusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for StatusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome posted back as a commit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub state: StatusState,
    pub description: String,
}

impl Verdict {
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            state: StatusState::Success,
            description: description.into(),
        }
    }

    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            state: StatusState::Failure,
            description: description.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.state == StatusState::Failure
    }
}

/// Whether an increase exceeds the limit. Exactly at the limit passes.
pub fn is_failure(increase: i64, max_size_increase: u64) -> bool {
    let limit = i64::try_from(max_size_increase).unwrap_or(i64::MAX);
    increase > limit
}

/// Classify the largest increase of a pull request.
///
/// Every outcome yields a verdict, including a positive increase within the
/// limit, so a pending status is always resolved.
pub fn classify(diff: &BuildArtifactDiff, max_size_increase: u64) -> Verdict {
    let path = &diff.artifact.full_path;
    let increase = diff.increase;

    if is_failure(increase, max_size_increase) {
        Verdict::failure(format!(
            "{} increased by {} bytes (limit {})",
            path, increase, max_size_increase
        ))
    } else if increase == 0 {
        Verdict::success("no size change")
    } else if increase < 0 {
        Verdict::success(format!(
            "{} decreased by {} bytes",
            path,
            increase.unsigned_abs()
        ))
    } else {
        Verdict::success(format!(
            "{} increased by {} bytes (limit {})",
            path, increase, max_size_increase
        ))
    }
}
