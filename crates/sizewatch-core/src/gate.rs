//! Size gate: one CI status event in, at most one verdict out.
//!
//! ```text
//! Idle -> AwaitingPrLookup -> Ingesting  ----------------------> Done
//!                          -> Evaluating -> Reporting ---------> Done
//! ```
//!
//! Branch pushes (no open pull request for the commit) are ingested into the
//! artifact store. Pull request heads are compared against the target
//! branch's snapshot at its exact base commit and a commit status is posted.
//!
//! Errors abort the event. A pending status already posted stays pending.

use std::sync::Arc;

use tracing::{debug, info, info_span, Instrument};

use crate::artifact::CommitMeta;
use crate::artifact_store::ArtifactStore;
use crate::ci::{parse_build_number, CiProvider};
use crate::config::{ConfigLoader, SizeConfig};
use crate::detector::find_largest_increase;
use crate::error::{SizeError, SizeResult};
use crate::event::StatusEvent;
use crate::github::{CommitStatus, PullRequest, SourceHost};
use crate::verdict::{classify, StatusState, Verdict};

/// Description of the pending status posted before evaluation.
pub const PENDING_DESCRIPTION: &str = "Calculating artifact sizes";

/// Description used when a pull request build produced no artifacts.
pub const NO_ARTIFACTS_DESCRIPTION: &str = "no artifacts to compare";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    AwaitingPrLookup,
    Ingesting,
    Evaluating,
    Reporting,
    Done,
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingPrLookup => "awaiting_pr_lookup",
            Self::Ingesting => "ingesting",
            Self::Evaluating => "evaluating",
            Self::Reporting => "reporting",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why an event was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Event state is not `success`.
    NotSuccess(StatusState),
    /// Size checking is disabled for the repository.
    Disabled,
    /// Status context does not belong to the watched CI provider.
    ContextMismatch(String),
}

/// What the gate did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Skipped(SkipReason),
    Ingested {
        projects: Vec<String>,
        branches: Vec<String>,
    },
    Evaluated {
        pull_request: u64,
        verdict: Verdict,
    },
}

/// Orchestrates ingestion and pull request gating.
///
/// Holds explicit handles to the store and every collaborator; nothing is
/// shared between events besides the store.
#[derive(Clone)]
pub struct SizeGate {
    store: ArtifactStore,
    ci: Arc<dyn CiProvider>,
    host: Arc<dyn SourceHost>,
    config: Arc<dyn ConfigLoader>,
}

impl std::fmt::Debug for SizeGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizeGate")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

struct Transitions {
    state: GateState,
}

impl Transitions {
    fn advance(&mut self, next: GateState) {
        debug!(from = %self.state, to = %next, "gate transition");
        self.state = next;
    }
}

impl SizeGate {
    pub fn new(
        store: ArtifactStore,
        ci: Arc<dyn CiProvider>,
        host: Arc<dyn SourceHost>,
        config: Arc<dyn ConfigLoader>,
    ) -> Self {
        Self {
            store,
            ci,
            host,
            config,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Process one CI status event to completion.
    pub async fn handle_status_event(&self, event: &StatusEvent) -> SizeResult<GateOutcome> {
        let span = info_span!(
            "size_gate",
            sha = %event.sha,
            repo = %event.repository.full_name(),
            context = %event.context
        );
        self.run(event).instrument(span).await
    }

    async fn run(&self, event: &StatusEvent) -> SizeResult<GateOutcome> {
        let mut fsm = Transitions {
            state: GateState::Idle,
        };

        if event.state != StatusState::Success {
            fsm.advance(GateState::Done);
            return Ok(GateOutcome::Skipped(SkipReason::NotSuccess(event.state)));
        }

        let config = self
            .config
            .load_config(event.owner(), event.repo(), event.repository.id)
            .await?;
        if config.disabled {
            fsm.advance(GateState::Done);
            return Ok(GateOutcome::Skipped(SkipReason::Disabled));
        }
        if !event.context.starts_with(&config.ci_context_prefix) {
            fsm.advance(GateState::Done);
            return Ok(GateOutcome::Skipped(SkipReason::ContextMismatch(
                event.context.clone(),
            )));
        }

        let target_url = event
            .target_url
            .as_deref()
            .ok_or_else(|| SizeError::MalformedBuildUrl {
                url: String::new(),
                reason: "status event has no target_url".to_string(),
            })?;
        let build_number = parse_build_number(target_url)?;

        fsm.advance(GateState::AwaitingPrLookup);
        let pr = self
            .host
            .find_open_pull_request(event.owner(), event.repo(), &event.sha, event.repository.id)
            .await?;

        let outcome = match pr {
            None => {
                fsm.advance(GateState::Ingesting);
                self.ingest(event, build_number).await?
            }
            Some(pr) => {
                fsm.advance(GateState::Evaluating);
                let verdict = self.evaluate(event, build_number, &pr, &config).await?;

                fsm.advance(GateState::Reporting);
                let status = CommitStatus::from_verdict(&verdict, &config.status.context);
                self.host
                    .set_commit_status(event.owner(), event.repo(), &event.sha, &status)
                    .await?;
                info!(
                    pull_request = pr.number,
                    state = %verdict.state,
                    description = %verdict.description,
                    "reported size verdict"
                );
                GateOutcome::Evaluated {
                    pull_request: pr.number,
                    verdict,
                }
            }
        };

        fsm.advance(GateState::Done);
        Ok(outcome)
    }

    async fn ingest(&self, event: &StatusEvent, build_number: u64) -> SizeResult<GateOutcome> {
        let branches = event.branch_names();
        if branches.is_empty() {
            info!("commit has no branches, nothing to store");
            return Ok(GateOutcome::Ingested {
                projects: Vec::new(),
                branches,
            });
        }

        let artifacts = self
            .ci
            .fetch_artifacts(event.owner(), event.repo(), build_number)
            .await?;
        let meta = CommitMeta::now(event.commit_message());
        let projects = self
            .store
            .save_build(&branches, &event.sha, &artifacts, &meta)
            .await?;

        Ok(GateOutcome::Ingested { projects, branches })
    }

    async fn evaluate(
        &self,
        event: &StatusEvent,
        build_number: u64,
        pr: &PullRequest,
        config: &SizeConfig,
    ) -> SizeResult<Verdict> {
        let pending = CommitStatus::new(
            StatusState::Pending,
            PENDING_DESCRIPTION,
            config.status.context.clone(),
        );
        self.host
            .set_commit_status(event.owner(), event.repo(), &event.sha, &pending)
            .await?;

        let candidate = self
            .ci
            .fetch_artifacts(event.owner(), event.repo(), build_number)
            .await?;
        let baseline = self
            .store
            .load_target_branch(&pr.base.ref_name, &pr.base.sha)
            .await?;

        debug!(
            pull_request = pr.number,
            base = %pr.base.ref_name,
            base_sha = %pr.base.sha,
            candidate = candidate.len(),
            baseline = baseline.len(),
            "comparing artifacts"
        );

        Ok(match find_largest_increase(&baseline, &candidate) {
            Some(diff) => classify(&diff, config.max_size_increase),
            None => Verdict::success(NO_ARTIFACTS_DESCRIPTION),
        })
    }
}
