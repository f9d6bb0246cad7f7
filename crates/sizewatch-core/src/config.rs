//! Service and per-repository configuration.
//!
//! # Service
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SIZEWATCH_GITHUB_URL` | GitHub API base (default: `https://api.github.com`) |
//! | `SIZEWATCH_GITHUB_TOKEN` | GitHub token |
//! | `SIZEWATCH_CIRCLECI_URL` | CircleCI API base (default: `https://circleci.com/api/v1.1`) |
//! | `SIZEWATCH_CIRCLECI_TOKEN` | CircleCI token |
//! | `SIZEWATCH_STORE` | Store spec (default: `file://./sizewatch-store.json`) |
//! | `SIZEWATCH_STORE_TOKEN` | Realtime Database auth token |
//! | `SIZEWATCH_TIMEOUT` | Request timeout in seconds (default: 30) |
//!
//! # Repository
//!
//! `.github/sizewatch.yml` in the watched repository:
//!
//! ```yaml
//! size:
//!   disabled: false
//!   max_size_increase: 1000
//!   ci_context_prefix: ci/circleci
//!   status:
//!     context: "ci/sizewatch: size"
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{SizeError, SizeResult};

/// Repository config file name, looked up under `.github/`.
pub const CONFIG_FILE: &str = "sizewatch.yml";

/// Size gate settings for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeConfig {
    /// Skip all processing for this repository.
    pub disabled: bool,

    /// Largest allowed per-artifact increase, in bytes.
    pub max_size_increase: u64,

    /// Status events are processed only when their context starts with this.
    pub ci_context_prefix: String,

    /// Commit status posted by the gate.
    pub status: StatusConfig,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            max_size_increase: 1000,
            ci_context_prefix: "ci/circleci".to_string(),
            status: StatusConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Context name of the posted commit status.
    pub context: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            context: "ci/sizewatch: size".to_string(),
        }
    }
}

/// Layout of the repository config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfigFile {
    pub size: SizeConfig,
}

impl RepoConfigFile {
    /// Parse YAML; an empty document yields defaults.
    pub fn parse(yaml: &str) -> SizeResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| SizeError::Config {
            message: format!("invalid {}: {}", CONFIG_FILE, e),
        })
    }
}

/// Loads the size settings of a repository.
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    async fn load_config(&self, owner: &str, repo: &str, repository_id: u64)
        -> SizeResult<SizeConfig>;
}

/// Same settings for every repository.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig(pub SizeConfig);

#[async_trait]
impl ConfigLoader for StaticConfig {
    async fn load_config(
        &self,
        _owner: &str,
        _repo: &str,
        _repository_id: u64,
    ) -> SizeResult<SizeConfig> {
        Ok(self.0.clone())
    }
}

/// Service-level configuration, read from `SIZEWATCH_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub github_url: String,
    pub github_token: Option<String>,
    pub circleci_url: String,
    pub circleci_token: Option<String>,

    /// Store spec, see [`crate::store::StoreSpec`].
    pub store: String,
    pub store_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            github_url: "https://api.github.com".to_string(),
            github_token: None,
            circleci_url: "https://circleci.com/api/v1.1".to_string(),
            circleci_token: None,
            store: "file://./sizewatch-store.json".to_string(),
            store_token: None,
            timeout_secs: 30,
        }
    }
}

impl ServiceConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            github_url: non_empty("SIZEWATCH_GITHUB_URL").unwrap_or(defaults.github_url),
            github_token: non_empty("SIZEWATCH_GITHUB_TOKEN"),
            circleci_url: non_empty("SIZEWATCH_CIRCLECI_URL").unwrap_or(defaults.circleci_url),
            circleci_token: non_empty("SIZEWATCH_CIRCLECI_TOKEN"),
            store: non_empty("SIZEWATCH_STORE").unwrap_or(defaults.store),
            store_token: non_empty("SIZEWATCH_STORE_TOKEN"),
            timeout_secs: non_empty("SIZEWATCH_TIMEOUT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = store.into();
        self
    }

    pub fn with_github_url(mut self, url: impl Into<String>) -> Self {
        self.github_url = url.into();
        self
    }

    pub fn with_circleci_url(mut self, url: impl Into<String>) -> Self {
        self.circleci_url = url.into();
        self
    }
}
