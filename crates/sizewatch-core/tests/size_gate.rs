//! End-to-end tests for SizeGate with in-process collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use sizewatch_core::ci::CiArtifact;
use sizewatch_core::github::GitRef;
use sizewatch_core::store::MemoryTreeStore;
use sizewatch_core::{
    Artifact, ArtifactStore, CiProvider, CommitMeta, CommitStatus, GateOutcome, PullRequest,
    SizeConfig, SizeError, SizeGate, SizeResult, SkipReason, SourceHost, StaticConfig,
    StatusEvent, StatusState,
};

const BUILD_URL: &str = "https://circleci.com/gh/acme/web/900?utm_source=github";

/// CI provider serving one canned build.
struct CannedBuild {
    artifacts: Vec<(String, u64)>,
    fetches: Mutex<Vec<u64>>,
}

impl CannedBuild {
    fn new(artifacts: &[(&str, u64)]) -> Arc<Self> {
        Arc::new(Self {
            artifacts: artifacts.iter().map(|(p, s)| (p.to_string(), *s)).collect(),
            fetches: Mutex::new(Vec::new()),
        })
    }

    fn fetched_builds(&self) -> Vec<u64> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl CiProvider for CannedBuild {
    async fn fetch_artifact_list(
        &self,
        _owner: &str,
        _repo: &str,
        build_number: u64,
    ) -> SizeResult<Vec<CiArtifact>> {
        self.fetches.lock().unwrap().push(build_number);
        Ok(self
            .artifacts
            .iter()
            .map(|(path, _)| CiArtifact {
                path: path.clone(),
                pretty_path: None,
                node_index: None,
                url: format!("https://dl.example/{}", path),
            })
            .collect())
    }

    async fn fetch_artifact_size(&self, download_url: &str) -> SizeResult<u64> {
        let sizes: HashMap<String, u64> = self
            .artifacts
            .iter()
            .map(|(p, s)| (format!("https://dl.example/{}", p), *s))
            .collect();
        sizes
            .get(download_url)
            .copied()
            .ok_or_else(|| SizeError::upstream("canned", "unknown artifact"))
    }
}

/// Source host recording every posted status.
#[derive(Default)]
struct RecordingHost {
    pull_request: Option<PullRequest>,
    posted: Mutex<Vec<CommitStatus>>,
}

impl RecordingHost {
    fn without_pull_request() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_pull_request(base_sha: &str) -> Arc<Self> {
        Arc::new(Self {
            pull_request: Some(PullRequest {
                number: 17,
                state: "open".to_string(),
                head: GitRef {
                    ref_name: "feature".to_string(),
                    sha: "head-sha".to_string(),
                    repo: None,
                },
                base: GitRef {
                    ref_name: "main".to_string(),
                    sha: base_sha.to_string(),
                    repo: None,
                },
            }),
            posted: Mutex::new(Vec::new()),
        })
    }

    fn posted(&self) -> Vec<CommitStatus> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceHost for RecordingHost {
    async fn set_commit_status(
        &self,
        _owner: &str,
        _repo: &str,
        _sha: &str,
        status: &CommitStatus,
    ) -> SizeResult<()> {
        self.posted.lock().unwrap().push(status.clone());
        Ok(())
    }

    async fn find_open_pull_request(
        &self,
        _owner: &str,
        _repo: &str,
        _sha: &str,
        _repository_id: u64,
    ) -> SizeResult<Option<PullRequest>> {
        Ok(self.pull_request.clone())
    }
}

fn event(sha: &str, state: &str, context: &str, target_url: Option<&str>, branches: &[&str]) -> StatusEvent {
    serde_json::from_value(json!({
        "sha": sha,
        "state": state,
        "context": context,
        "target_url": target_url,
        "repository": { "id": 42, "name": "web", "owner": { "login": "acme" } },
        "branches": branches.iter().map(|b| json!({ "name": b })).collect::<Vec<_>>(),
        "commit": { "sha": sha, "commit": { "message": "feat: grow" } }
    }))
    .unwrap()
}

fn pr_event() -> StatusEvent {
    event("head-sha", "success", "ci/circleci: build", Some(BUILD_URL), &[])
}

fn config(max_size_increase: u64) -> Arc<StaticConfig> {
    Arc::new(StaticConfig(SizeConfig {
        max_size_increase,
        ..SizeConfig::default()
    }))
}

async fn seeded_store(baseline: &[(&str, u64)]) -> ArtifactStore {
    let store = ArtifactStore::new(Arc::new(MemoryTreeStore::new()));
    let artifacts: Vec<Artifact> = baseline
        .iter()
        .map(|(p, s)| Artifact::from_path(*p, *s).unwrap())
        .collect();
    store
        .save_build(&["main".to_string()], "base-sha", &artifacts, &CommitMeta::now("base"))
        .await
        .unwrap();
    store
}

async fn evaluate(
    baseline: &[(&str, u64)],
    candidate: &[(&str, u64)],
    max_size_increase: u64,
) -> (GateOutcome, Vec<CommitStatus>) {
    let host = RecordingHost::with_pull_request("base-sha");
    let gate = SizeGate::new(
        seeded_store(baseline).await,
        CannedBuild::new(candidate),
        host.clone(),
        config(max_size_increase),
    );
    let outcome = gate.handle_status_event(&pr_event()).await.unwrap();
    (outcome, host.posted())
}

#[tokio::test]
async fn test_branch_push_is_ingested() {
    let host = RecordingHost::without_pull_request();
    let ci = CannedBuild::new(&[("aio/gzip7/main", 5400), ("core/bundle", 300)]);
    let store = ArtifactStore::new(Arc::new(MemoryTreeStore::new()));
    let gate = SizeGate::new(store.clone(), ci.clone(), host.clone(), config(1000));

    let outcome = gate
        .handle_status_event(&event("abc", "success", "ci/circleci: build", Some(BUILD_URL), &["main"]))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        GateOutcome::Ingested {
            projects: vec!["aio".to_string(), "core".to_string()],
            branches: vec!["main".to_string()],
        }
    );
    assert_eq!(ci.fetched_builds(), vec![900]);
    assert!(host.posted().is_empty());
    assert_eq!(
        store.load_for_ref("aio", "main", "abc").await.unwrap(),
        vec![Artifact::from_path("aio/gzip7/main", 5400).unwrap()]
    );
    let snapshot = store.load_snapshot("core", "main", "abc").await.unwrap().unwrap();
    assert_eq!(snapshot.meta.message, "feat: grow");
}

#[tokio::test]
async fn test_increase_over_limit_fails() {
    let (outcome, posted) = evaluate(&[("web/main.js", 1000)], &[("web/main.js", 1101)], 100).await;

    assert_eq!(posted.len(), 2);
    assert_eq!(posted[0].state, StatusState::Pending);
    assert_eq!(posted[0].description, "Calculating artifact sizes");
    assert_eq!(posted[0].context, "ci/sizewatch: size");
    assert_eq!(posted[1].state, StatusState::Failure);
    assert_eq!(posted[1].description, "web/main.js increased by 101 bytes (limit 100)");

    match outcome {
        GateOutcome::Evaluated {
            pull_request,
            verdict,
        } => {
            assert_eq!(pull_request, 17);
            assert!(verdict.is_failure());
        }
        other => panic!("expected Evaluated, got {other:?}"),
    }
}

#[tokio::test]
async fn test_increase_at_limit_passes() {
    let (_, posted) = evaluate(&[("web/main.js", 1000)], &[("web/main.js", 1100)], 100).await;
    assert_eq!(posted[1].state, StatusState::Success);
    assert_eq!(posted[1].description, "web/main.js increased by 100 bytes (limit 100)");
}

#[tokio::test]
async fn test_decrease_passes() {
    let (_, posted) = evaluate(&[("web/main.js", 1000)], &[("web/main.js", 800)], 100).await;
    assert_eq!(posted[1].state, StatusState::Success);
    assert_eq!(posted[1].description, "web/main.js decreased by 200 bytes");
}

#[tokio::test]
async fn test_unchanged_build_passes() {
    let (_, posted) = evaluate(
        &[("web/main.js", 1000), ("web/vendor.js", 5000)],
        &[("web/main.js", 1000), ("web/vendor.js", 5000)],
        100,
    )
    .await;
    assert_eq!(posted[1].state, StatusState::Success);
    assert_eq!(posted[1].description, "no size change");
}

#[tokio::test]
async fn test_new_artifact_counts_full_size() {
    let (_, posted) = evaluate(
        &[("web/main.js", 1000)],
        &[("web/main.js", 1000), ("web/lazy.js", 4000)],
        1000,
    )
    .await;
    assert_eq!(posted[1].state, StatusState::Failure);
    assert_eq!(posted[1].description, "web/lazy.js increased by 4000 bytes (limit 1000)");
}

#[tokio::test]
async fn test_empty_candidate_build_passes() {
    let (_, posted) = evaluate(&[("web/main.js", 1000)], &[], 100).await;
    assert_eq!(posted[1].state, StatusState::Success);
    assert_eq!(posted[1].description, "no artifacts to compare");
}

#[tokio::test]
async fn test_missing_baseline_leaves_pending() {
    let host = RecordingHost::with_pull_request("unrecorded-sha");
    let gate = SizeGate::new(
        seeded_store(&[("web/main.js", 1000)]).await,
        CannedBuild::new(&[("web/main.js", 1100)]),
        host.clone(),
        config(100),
    );

    let err = gate.handle_status_event(&pr_event()).await.unwrap_err();
    assert!(matches!(err, SizeError::NotFound { .. }));

    let posted = host.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].state, StatusState::Pending);
}

#[tokio::test]
async fn test_non_success_event_is_skipped() {
    let host = RecordingHost::with_pull_request("base-sha");
    let ci = CannedBuild::new(&[("web/main.js", 1)]);
    let gate = SizeGate::new(seeded_store(&[("web/main.js", 1)]).await, ci.clone(), host.clone(), config(100));

    let outcome = gate
        .handle_status_event(&event("head-sha", "pending", "ci/circleci: build", Some(BUILD_URL), &[]))
        .await
        .unwrap();
    assert_eq!(outcome, GateOutcome::Skipped(SkipReason::NotSuccess(StatusState::Pending)));
    assert!(host.posted().is_empty());
    assert!(ci.fetched_builds().is_empty());
}

#[tokio::test]
async fn test_disabled_repository_is_skipped() {
    let host = RecordingHost::with_pull_request("base-sha");
    let gate = SizeGate::new(
        seeded_store(&[("web/main.js", 1)]).await,
        CannedBuild::new(&[("web/main.js", 5000)]),
        host.clone(),
        Arc::new(StaticConfig(SizeConfig {
            disabled: true,
            ..SizeConfig::default()
        })),
    );

    let outcome = gate.handle_status_event(&pr_event()).await.unwrap();
    assert_eq!(outcome, GateOutcome::Skipped(SkipReason::Disabled));
    assert!(host.posted().is_empty());
}

#[tokio::test]
async fn test_foreign_context_is_skipped() {
    let host = RecordingHost::with_pull_request("base-sha");
    let gate = SizeGate::new(
        seeded_store(&[("web/main.js", 1)]).await,
        CannedBuild::new(&[("web/main.js", 5000)]),
        host.clone(),
        config(100),
    );

    let outcome = gate
        .handle_status_event(&event("head-sha", "success", "ci/travis", Some(BUILD_URL), &[]))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        GateOutcome::Skipped(SkipReason::ContextMismatch("ci/travis".to_string()))
    );
    assert!(host.posted().is_empty());
}

#[tokio::test]
async fn test_malformed_build_url_fails_before_any_call() {
    let host = RecordingHost::with_pull_request("base-sha");
    let ci = CannedBuild::new(&[("web/main.js", 1)]);
    let gate = SizeGate::new(seeded_store(&[("web/main.js", 1)]).await, ci.clone(), host.clone(), config(100));

    for target_url in [Some("https://circleci.com/gh/acme/web"), None] {
        let err = gate
            .handle_status_event(&event("head-sha", "success", "ci/circleci: build", target_url, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, SizeError::MalformedBuildUrl { .. }));
        assert_eq!(err.exit_code(), 2);
    }
    assert!(host.posted().is_empty());
    assert!(ci.fetched_builds().is_empty());
}
