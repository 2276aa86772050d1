//! Rate budget check performed before each cycle.

use chrono::{DateTime, Utc};

use crate::github::{GitHubClient, GitHubError};
use crate::rate_limit::time_until;

/// Remaining core API budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    Available {
        remaining: usize,
        limit: usize,
        reset_at: DateTime<Utc>,
    },
    Exhausted {
        reset_at: DateTime<Utc>,
    },
}

impl Budget {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Budget::Exhausted { .. })
    }
}

/// Query `/rate_limit` and classify the core budget.
///
/// The call itself spends one request.
pub async fn check_rate_budget(client: &GitHubClient) -> Result<Budget, GitHubError> {
    let limits = client.get_rate_limit().await?;
    let core = limits.resources.core;
    let reset_at = core.reset_at();

    if core.remaining == 0 {
        tracing::warn!(
            "Hit rate limit. Rate reset in {} at {}",
            time_until(reset_at),
            reset_at
        );
        return Ok(Budget::Exhausted { reset_at });
    }

    tracing::debug!(
        remaining = core.remaining,
        limit = core.limit,
        "Rate budget available"
    );
    Ok(Budget::Available {
        remaining: core.remaining,
        limit: core.limit,
        reset_at,
    })
}
