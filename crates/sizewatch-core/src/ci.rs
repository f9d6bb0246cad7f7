//! CI provider client.
//!
//! Artifact lists come from the CircleCI v1.1 API; each artifact's size is the
//! `Content-Length` of its download URL. The body is never read.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_LENGTH;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::artifact::Artifact;
use crate::error::{SizeError, SizeResult};
use crate::http::{Auth, HttpBackend};

/// Artifact entry as listed by the CI provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiArtifact {
    /// Slash-delimited artifact path, project first.
    pub path: String,

    #[serde(default)]
    pub pretty_path: Option<String>,

    #[serde(default)]
    pub node_index: Option<u32>,

    /// Download URL.
    pub url: String,
}

/// Upper bound on size requests in flight for one build.
pub const MAX_CONCURRENT_SIZE_REQUESTS: usize = 8;

/// Source of build artifacts and their sizes.
#[async_trait]
pub trait CiProvider: Send + Sync {
    async fn fetch_artifact_list(
        &self,
        owner: &str,
        repo: &str,
        build_number: u64,
    ) -> SizeResult<Vec<CiArtifact>>;

    async fn fetch_artifact_size(&self, download_url: &str) -> SizeResult<u64>;

    /// List a build's artifacts and size each one.
    ///
    /// Sizes are fetched concurrently, at most [`MAX_CONCURRENT_SIZE_REQUESTS`]
    /// at a time; output keeps the listing order.
    async fn fetch_artifacts(
        &self,
        owner: &str,
        repo: &str,
        build_number: u64,
    ) -> SizeResult<Vec<Artifact>> {
        let listed = self.fetch_artifact_list(owner, repo, build_number).await?;
        debug!(owner, repo, build_number, count = listed.len(), "listed build artifacts");

        let requests: Vec<_> = listed.iter().map(|a| self.fetch_artifact_size(&a.url)).collect();
        let sizes: Vec<u64> = stream::iter(requests)
            .buffered(MAX_CONCURRENT_SIZE_REQUESTS)
            .try_collect()
            .await?;
        listed
            .into_iter()
            .zip(sizes)
            .map(|(entry, size)| Artifact::from_path(entry.path, size))
            .collect()
    }
}

/// Extract the build number from a CI status target URL.
///
/// Accepts `https://<host>[/<vendor-path>]/gh/<owner>/<repo>/<build>[?query]`.
pub fn parse_build_number(target_url: &str) -> SizeResult<u64> {
    let malformed = |reason: &str| SizeError::MalformedBuildUrl {
        url: target_url.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(target_url).map_err(|e| malformed(&e.to_string()))?;
    if url.scheme() != "https" {
        return Err(malformed("expected https scheme"));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let gh = segments
        .iter()
        .position(|s| *s == "gh")
        .filter(|&i| i <= 1)
        .ok_or_else(|| malformed("missing gh path segment"))?;

    match &segments[gh + 1..] {
        [_owner, _repo, build] => build
            .parse::<u64>()
            .map_err(|_| malformed("build number is not numeric")),
        _ => Err(malformed("expected gh/<owner>/<repo>/<build>")),
    }
}

/// CircleCI API client.
#[derive(Debug, Clone)]
pub struct CircleCiClient {
    http: HttpBackend,
}

impl CircleCiClient {
    /// Create a client for the API at `base_url` (e.g. `https://circleci.com/api/v1.1`).
    pub fn new(base_url: &str, token: Option<String>, timeout_secs: u64) -> SizeResult<Self> {
        let auth = match token {
            Some(token) if !token.is_empty() => Auth::Header("Circle-Token", token),
            _ => Auth::None,
        };
        Ok(Self {
            http: HttpBackend::new("circleci", base_url, auth, timeout_secs)?,
        })
    }
}

#[async_trait]
impl CiProvider for CircleCiClient {
    async fn fetch_artifact_list(
        &self,
        owner: &str,
        repo: &str,
        build_number: u64,
    ) -> SizeResult<Vec<CiArtifact>> {
        let url = self.http.url(&format!(
            "project/github/{}/{}/{}/artifacts",
            owner, repo, build_number
        ));
        let response = self.http.send(self.http.request(Method::GET, &url)).await?;
        self.http.json(response).await
    }

    async fn fetch_artifact_size(&self, download_url: &str) -> SizeResult<u64> {
        let response = self
            .http
            .send(self.http.request(Method::GET, download_url))
            .await?;

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                SizeError::upstream(
                    self.http.service(),
                    format!("no content-length for {}", download_url),
                )
            })
    }
}
