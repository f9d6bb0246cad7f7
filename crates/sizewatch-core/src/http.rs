//! HTTP layer shared by the upstream clients.
//!
//! This is the only place that interprets status codes. Clients build
//! requests through [`HttpBackend::request`] and get either a successful
//! response or a [`SizeError::Upstream`] carrying the status and body.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::error::{SizeError, SizeResult};

/// User agent for upstream requests.
pub const USER_AGENT_VALUE: &str = concat!("sizewatch/", env!("CARGO_PKG_VERSION"));

/// How a backend authenticates.
#[derive(Debug, Clone)]
pub(crate) enum Auth {
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// Token sent in a named header.
    Header(&'static str, String),
    /// Token sent as a query parameter.
    Query(&'static str, String),
}

/// HTTP backend for one upstream service.
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    auth: Auth,
    service: &'static str,
}

impl HttpBackend {
    pub(crate) fn new(
        service: &'static str,
        base_url: &str,
        auth: Auth,
        timeout_secs: u64,
    ) -> SizeResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| SizeError::upstream(service, format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            service,
        })
    }

    pub(crate) fn service(&self) -> &'static str {
        self.service
    }

    /// Absolute URL for an API path such as `/repos/o/r`.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request with authentication applied.
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            Auth::Header(name, token) => request.header(*name, token),
            Auth::Query(name, token) => request.query(&[(*name, token)]),
        }
    }

    /// Send a request; any non-2xx status is an error.
    pub(crate) async fn send(&self, request: RequestBuilder) -> SizeResult<Response> {
        match self.send_optional(request).await? {
            Some(response) => Ok(response),
            None => Err(SizeError::Upstream {
                service: self.service.to_string(),
                status: Some(StatusCode::NOT_FOUND.as_u16()),
                message: "not found".to_string(),
            }),
        }
    }

    /// Send a request; 404 maps to `None`, other non-2xx statuses are errors.
    pub(crate) async fn send_optional(
        &self,
        request: RequestBuilder,
    ) -> SizeResult<Option<Response>> {
        let response = request.send().await.map_err(|e| SizeError::Upstream {
            service: self.service.to_string(),
            status: None,
            message: e.without_url().to_string(),
        })?;
        let status = response.status();
        debug!(
            service = self.service,
            path = response.url().path(),
            status = status.as_u16(),
            "upstream response"
        );

        if status.is_success() {
            return Ok(Some(response));
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.to_string()
        } else {
            body
        };
        Err(SizeError::Upstream {
            service: self.service.to_string(),
            status: Some(status.as_u16()),
            message,
        })
    }

    /// Decode a JSON response body.
    pub(crate) async fn json<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> SizeResult<T> {
        response.json::<T>().await.map_err(|e| {
            SizeError::upstream(
                self.service,
                format!("invalid response body: {}", e.without_url()),
            )
        })
    }
}
