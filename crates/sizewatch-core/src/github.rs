//! Source-control host client (GitHub REST API).

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ConfigLoader, RepoConfigFile, SizeConfig, CONFIG_FILE};
use crate::error::SizeResult;
use crate::http::{Auth, HttpBackend};
use crate::verdict::{StatusState, Verdict};

/// GitHub's limit on commit status descriptions.
pub const MAX_DESCRIPTION_LEN: usize = 140;

/// A commit status to post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitStatus {
    pub state: StatusState,
    pub description: String,
    pub context: String,
}

impl CommitStatus {
    pub fn new(state: StatusState, description: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            state,
            description: truncate_description(description.into()),
            context: context.into(),
        }
    }

    pub fn from_verdict(verdict: &Verdict, context: impl Into<String>) -> Self {
        Self::new(verdict.state, verdict.description.clone(), context)
    }
}

fn truncate_description(description: String) -> String {
    if description.chars().count() <= MAX_DESCRIPTION_LEN {
        return description;
    }
    let mut truncated: String = description.chars().take(MAX_DESCRIPTION_LEN - 1).collect();
    truncated.push('…');
    truncated
}

/// Branch reference of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,

    pub sha: String,

    #[serde(default)]
    pub repo: Option<RepoId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoId {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub state: String,
    pub head: GitRef,
    pub base: GitRef,
}

/// Source-control host operations used by the gate.
#[async_trait]
pub trait SourceHost: Send + Sync {
    async fn set_commit_status(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> SizeResult<()>;

    /// Open pull request whose head is `sha` in repository `repository_id`.
    async fn find_open_pull_request(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        repository_id: u64,
    ) -> SizeResult<Option<PullRequest>>;
}

/// GitHub REST API client.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: HttpBackend,
}

impl GithubClient {
    pub fn new(base_url: &str, token: Option<String>, timeout_secs: u64) -> SizeResult<Self> {
        let auth = match token {
            Some(token) if !token.is_empty() => Auth::Bearer(token),
            _ => Auth::None,
        };
        Ok(Self {
            http: HttpBackend::new("github", base_url, auth, timeout_secs)?,
        })
    }
}

#[async_trait]
impl SourceHost for GithubClient {
    async fn set_commit_status(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        status: &CommitStatus,
    ) -> SizeResult<()> {
        let url = self.http.url(&format!("repos/{}/{}/statuses/{}", owner, repo, sha));
        let request = self
            .http
            .request(Method::POST, &url)
            .header(ACCEPT, "application/vnd.github+json")
            .json(status);
        self.http.send(request).await?;
        debug!(owner, repo, sha, state = %status.state, "posted commit status");
        Ok(())
    }

    async fn find_open_pull_request(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        repository_id: u64,
    ) -> SizeResult<Option<PullRequest>> {
        let url = self.http.url(&format!("repos/{}/{}/commits/{}/pulls", owner, repo, sha));
        let request = self
            .http
            .request(Method::GET, &url)
            .header(ACCEPT, "application/vnd.github+json");
        let Some(response) = self.http.send_optional(request).await? else {
            return Ok(None);
        };
        let pulls: Vec<PullRequest> = self.http.json(response).await?;

        Ok(pulls.into_iter().find(|pr| {
            pr.state == "open"
                && pr.head.sha == sha
                && !matches!(&pr.base.repo, Some(r) if r.id != repository_id)
        }))
    }
}

#[async_trait]
impl ConfigLoader for GithubClient {
    /// Read `.github/sizewatch.yml`; a missing file yields defaults.
    async fn load_config(
        &self,
        owner: &str,
        repo: &str,
        _repository_id: u64,
    ) -> SizeResult<SizeConfig> {
        let url = self.http.url(&format!(
            "repos/{}/{}/contents/.github/{}",
            owner, repo, CONFIG_FILE
        ));
        let request = self
            .http
            .request(Method::GET, &url)
            .header(ACCEPT, "application/vnd.github.raw");
        let Some(response) = self.http.send_optional(request).await? else {
            debug!(owner, repo, "no repository config, using defaults");
            return Ok(SizeConfig::default());
        };
        let content = response.text().await?;
        Ok(RepoConfigFile::parse(&content)?.size)
    }
}
