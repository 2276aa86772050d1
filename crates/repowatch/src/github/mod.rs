//! GitHub REST API access.

mod client;
mod error;
mod pagination;
mod types;

pub use client::{DEFAULT_MAX_PAGES, GITHUB_API_URL, GitHubClient, PAGE_SIZE};
pub use error::{GitHubError, short_error_message};
pub use pagination::PageWalk;
pub use types::{
    GitHubIssue, GitHubRateLimitResponse, GitHubRateLimits, GitHubRepo, RateLimitResource,
    Stargazer,
};
