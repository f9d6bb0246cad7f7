//! Error types for size tracking and gating.

/// Size gate errors.
///
/// Every variant is fatal for the event being processed; the gate never
/// retries and never converts an error into a commit status.
#[derive(Debug, thiserror::Error)]
pub enum SizeError {
    /// CI build URL does not have the expected shape.
    #[error("malformed build url '{url}': {reason}")]
    MalformedBuildUrl { url: String, reason: String },

    /// Artifact path has no project segment or no context path.
    #[error("invalid artifact path: {path}")]
    InvalidArtifactPath { path: String },

    /// A path segment is required to be both a leaf and a branch.
    #[error("conflicting artifact path: {path}")]
    ConflictingPath { path: String },

    /// No snapshot stored for the requested commit.
    #[error("no artifact snapshot for {project}/{branch}@{commit}")]
    NotFound {
        project: String,
        branch: String,
        commit: String,
    },

    /// CI provider or source-control host request failed.
    #[error("{service} request failed{}: {message}", status_suffix(.status))]
    Upstream {
        service: String,
        status: Option<u16>,
        message: String,
    },

    /// Backing tree store read/write failed or held malformed data.
    #[error("store error: {message}")]
    Store { message: String },

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SizeError {
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            status: None,
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Input shape problems
            Self::MalformedBuildUrl { .. } => 2,
            Self::InvalidArtifactPath { .. } => 2,
            Self::ConflictingPath { .. } => 2,
            Self::Config { .. } => 2,

            // Missing baseline
            Self::NotFound { .. } => 3,

            // Network/storage
            Self::Upstream { .. } => 4,
            Self::Store { .. } => 5,
        }
    }
}

impl From<reqwest::Error> for SizeError {
    fn from(err: reqwest::Error) -> Self {
        let service = err
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("http")
            .to_string();
        Self::Upstream {
            service,
            status: err.status().map(|s| s.as_u16()),
            message: err.without_url().to_string(),
        }
    }
}

impl From<serde_json::Error> for SizeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store {
            message: format!("json error: {}", err),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

/// Result type for size operations.
pub type SizeResult<T> = Result<T, SizeError>;
