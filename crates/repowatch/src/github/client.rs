//! GitHub REST client over the [`HttpTransport`] seam.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::error::GitHubError;
use super::types::{GitHubRateLimitResponse, GitHubRepo};
use crate::http::{HttpMethod, HttpRequest, HttpTransport};
use crate::rate_limit::ApiRateLimiter;

/// Default GitHub API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Items requested per page on every paginated endpoint.
pub const PAGE_SIZE: u32 = 100;

/// Default upper bound on pages walked by a single paginated fetch.
pub const DEFAULT_MAX_PAGES: u32 = 100;

const USER_AGENT: &str = "repowatch";
const API_VERSION: &str = "2022-11-28";

/// GitHub API client.
///
/// Authentication is the transport's concern: wrap the transport in a
/// [`CachingTransport`](crate::cache::CachingTransport) configured with a
/// token to send authenticated requests.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    /// Optional rate limiter for pacing API requests.
    rate_limiter: Option<ApiRateLimiter>,
    max_pages: u32,
}

impl GitHubClient {
    /// Create a client talking to `base_url` through `transport`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let transport = ReqwestTransport::with_timeout(Duration::from_secs(30))?;
    /// let client = GitHubClient::new_with_transport(GITHUB_API_URL, Arc::new(transport), None);
    /// let repo = client.get_repo("rust-lang", "cargo").await?;
    /// ```
    pub fn new_with_transport(
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
        rate_limiter: Option<ApiRateLimiter>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Override the page bound used by paginated fetches. Zero is treated as one.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Wait for rate limiter if one is configured.
    async fn wait_for_rate_limit(&self) {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }
    }

    /// GET `route` (relative to the base URL) and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, route: &str) -> Result<T, GitHubError> {
        self.wait_for_rate_limit().await;

        let request = HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}{}", self.base_url, route),
            headers: vec![
                (
                    "Accept".to_string(),
                    "application/vnd.github+json".to_string(),
                ),
                ("User-Agent".to_string(), USER_AGENT.to_string()),
                ("X-GitHub-Api-Version".to_string(), API_VERSION.to_string()),
            ],
            body: Vec::new(),
        };

        let response = self.transport.send(request).await?;
        tracing::debug!(route, status = response.status, "GitHub response");

        if !response.is_success() {
            return Err(GitHubError::from_response(route, &response));
        }

        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Current rate limit status (`GET /rate_limit`).
    pub async fn get_rate_limit(&self) -> Result<GitHubRateLimitResponse, GitHubError> {
        self.get("/rate_limit").await
    }

    /// Metadata for one repository (`GET /repos/{owner}/{name}`).
    pub async fn get_repo(&self, owner: &str, name: &str) -> Result<GitHubRepo, GitHubError> {
        self.get(&format!("/repos/{}/{}", owner, name)).await
    }
}
