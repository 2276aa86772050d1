//! Periodic watching of a GitHub organization.
//!
//! # Example
//!
//! ```ignore
//! use repowatch::watcher::Watcher;
//!
//! let mut watcher = Watcher::new();
//! watcher.set_github_token(std::env::var("GITHUB_TOKEN").unwrap_or_default());
//! watcher.set_organization("rust-lang");
//! watcher.add_repositories(["cargo", "rustup"]);
//!
//! let job = watcher.schedule("@every 30m")?;
//! job.run_and_hold().await?;
//! ```

mod error;
mod job;
mod schedule;

use std::sync::Arc;
use std::time::Duration;

pub use error::WatchError;
pub use job::{JobState, WatchJob};
pub use schedule::Schedule;

use crate::cache::CachingTransport;
use crate::github::{DEFAULT_MAX_PAGES, GITHUB_API_URL, GitHubClient};
use crate::http::HttpTransport;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::rate_limit::ApiRateLimiter;
use crate::sync::{ChangeReport, SyncEngine, SyncOptions, WatchTarget};

/// Receives every change report a job computes.
pub type ReportCallback = Arc<dyn Fn(&ChangeReport) + Send + Sync>;

/// Default timeout for a single API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Watch configuration. Turned into a [`WatchJob`] by [`Watcher::schedule`].
#[derive(Clone)]
pub struct Watcher {
    github_token: String,
    organization: String,
    repositories: Vec<String>,
    api_url: String,
    options: SyncOptions,
    max_pages: u32,
    requests_per_second: Option<u32>,
    request_timeout: Duration,
    on_report: Option<ReportCallback>,
}

impl Default for Watcher {
    fn default() -> Self {
        Self {
            github_token: String::new(),
            organization: String::new(),
            repositories: Vec::new(),
            api_url: GITHUB_API_URL.to_string(),
            options: SyncOptions::default(),
            max_pages: DEFAULT_MAX_PAGES,
            requests_per_second: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            on_report: None,
        }
    }
}

impl Watcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token sent as `Authorization: Bearer`. Empty means unauthenticated.
    pub fn set_github_token(&mut self, token: impl Into<String>) -> &mut Self {
        self.github_token = token.into();
        self
    }

    pub fn set_organization(&mut self, name: impl Into<String>) -> &mut Self {
        self.organization = name.into();
        self
    }

    /// Narrow the watch to these repositories. With none added the whole
    /// organization is watched.
    pub fn add_repositories<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repositories.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn set_api_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.api_url = url.into();
        self
    }

    pub fn set_concurrency(&mut self, concurrency: usize) -> &mut Self {
        self.options.concurrency = concurrency.max(1);
        self
    }

    pub fn set_max_pages(&mut self, max_pages: u32) -> &mut Self {
        self.max_pages = max_pages;
        self
    }

    /// Pace requests client-side. `None` disables pacing.
    pub fn set_requests_per_second(&mut self, rps: Option<u32>) -> &mut Self {
        self.requests_per_second = rps;
        self
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.request_timeout = timeout;
        self
    }

    pub fn on_report<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&ChangeReport) + Send + Sync + 'static,
    {
        self.on_report = Some(Arc::new(callback));
        self
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn repositories(&self) -> &[String] {
        &self.repositories
    }

    fn target(&self) -> Result<WatchTarget, WatchError> {
        if self.organization.trim().is_empty() {
            return Err(WatchError::MissingOrganization);
        }
        Ok(WatchTarget::new(self.organization.trim())
            .with_repositories(self.repositories.iter().map(|r| r.trim().to_string())))
    }

    fn client(&self, transport: Arc<dyn HttpTransport>) -> GitHubClient {
        let limiter = self.requests_per_second.map(ApiRateLimiter::new);
        GitHubClient::new_with_transport(&self.api_url, transport, limiter)
            .with_max_pages(self.max_pages)
    }

    /// Build a sync engine over the caching reqwest transport.
    pub fn engine(&self) -> Result<SyncEngine, WatchError> {
        let target = self.target()?;
        let http = ReqwestTransport::with_timeout(self.request_timeout)
            .map_err(|e| WatchError::Runtime(e.to_string()))?;
        let caching = Arc::new(
            CachingTransport::with_memory_cache(http).with_token(self.github_token.clone()),
        );

        Ok(
            SyncEngine::new(self.client(caching.clone()), target, self.options.clone())
                .with_cache_metrics(caching),
        )
    }

    /// Build a sync engine that sends requests through `transport` as is.
    pub fn engine_with_transport(
        &self,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<SyncEngine, WatchError> {
        let target = self.target()?;
        Ok(SyncEngine::new(
            self.client(transport),
            target,
            self.options.clone(),
        ))
    }

    /// Validate the configuration and create a job firing on `expr`.
    ///
    /// Fails before anything is armed if the organization or the expression
    /// is missing, or the expression does not parse.
    pub fn schedule(&self, expr: &str) -> Result<WatchJob, WatchError> {
        let schedule = self.validate(expr)?;
        Ok(WatchJob::new(self.engine()?, schedule, self.on_report.clone()))
    }

    /// Like [`schedule`](Watcher::schedule), over a caller-supplied transport.
    pub fn schedule_with_transport(
        &self,
        expr: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<WatchJob, WatchError> {
        let schedule = self.validate(expr)?;
        Ok(WatchJob::new(
            self.engine_with_transport(transport)?,
            schedule,
            self.on_report.clone(),
        ))
    }

    fn validate(&self, expr: &str) -> Result<Schedule, WatchError> {
        self.target()?;
        Schedule::parse(expr)
    }
}
