//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::http::{HttpError, HttpResponse, header_get};
use crate::rate_limit::parse_rate_limit_headers;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Pagination of {route} exceeded {max_pages} pages")]
    PageLimitExceeded { route: String, max_pages: u32 },
}

impl GitHubError {
    /// Map a non-2xx response into the matching error variant.
    pub(crate) fn from_response(route: &str, response: &HttpResponse) -> Self {
        match response.status {
            401 => Self::AuthRequired,
            403 | 429 => match rate_limit_reset(response) {
                Some(reset_at) => Self::RateLimited { reset_at },
                None if response.status == 429 => Self::RateLimited {
                    reset_at: Utc::now(),
                },
                None => Self::AuthRequired,
            },
            404 => Self::NotFound(route.to_string()),
            status => Self::Api {
                status,
                message: String::from_utf8_lossy(&response.body).trim().to_string(),
            },
        }
    }
}

/// Reset instant for a rate-limited response, from exhausted
/// `x-ratelimit-*` headers or a `retry-after` delay in seconds.
fn rate_limit_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
    if let Some(info) = parse_rate_limit_headers(&response.headers)
        && info.is_exhausted()
    {
        return Some(info.reset_at);
    }
    let secs = header_get(&response.headers, "retry-after")?
        .trim()
        .parse::<i64>()
        .ok()?;
    Some(Utc::now() + chrono::Duration::seconds(secs))
}

/// First line of an error's display text, for compact log lines.
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}
