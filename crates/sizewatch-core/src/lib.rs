//! Build artifact size tracking and pull request size gating.
//!
//! This crate provides:
//!
//! - Path tree codec between flat artifact lists and nested size trees
//! - Snapshot storage per (project, branch, commit) over a tree store
//! - Largest-increase detection between two builds
//! - The size gate that ingests branch builds and reports pull request verdicts
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sizewatch_core::{
//!     open_store, ArtifactStore, CircleCiClient, GithubClient, ServiceConfig, SizeGate,
//!     StatusEvent, StoreSpec,
//! };
//!
//! # async fn example(event: StatusEvent) -> Result<(), sizewatch_core::SizeError> {
//! let config = ServiceConfig::from_env();
//! let store = open_store(&StoreSpec::parse(&config.store)?, None, config.timeout_secs).await?;
//! let github = Arc::new(GithubClient::new(&config.github_url, config.github_token.clone(), 30)?);
//! let circleci = Arc::new(CircleCiClient::new(&config.circleci_url, None, 30)?);
//!
//! let gate = SizeGate::new(ArtifactStore::new(store), circleci, github.clone(), github);
//! let outcome = gate.handle_status_event(&event).await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```
//!
//! # Storage
//!
//! Snapshots live at `payload/{project}/{branch}/{commit_sha}`. See
//! [`artifact_store`] for the stored document layout.

pub mod artifact;
pub mod artifact_store;
pub mod ci;
pub mod config;
pub mod detector;
pub mod error;
pub mod event;
pub mod gate;
pub mod github;
mod http;
pub mod store;
pub mod tree;
pub mod verdict;

// Re-export main types
pub use artifact::{Artifact, BuildArtifactDiff, CommitMeta};
pub use artifact_store::{ArtifactStore, Snapshot};
pub use ci::{parse_build_number, CiArtifact, CiProvider, CircleCiClient};
pub use config::{
    ConfigLoader, RepoConfigFile, ServiceConfig, SizeConfig, StaticConfig, StatusConfig,
};
pub use detector::find_largest_increase;
pub use error::{SizeError, SizeResult};
pub use event::StatusEvent;
pub use gate::{GateOutcome, GateState, SizeGate, SkipReason};
pub use github::{CommitStatus, GithubClient, PullRequest, SourceHost};
pub use http::USER_AGENT_VALUE;
pub use store::{open_store, StoreSpec, TreeStore};
pub use tree::{ArtifactTree, TreeNode};
pub use verdict::{classify, StatusState, Verdict};
