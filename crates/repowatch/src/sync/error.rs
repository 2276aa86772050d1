use thiserror::Error;

use crate::github::GitHubError;

/// Errors that abandon a sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error("Invalid watch target: {0}")]
    InvalidTarget(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Reset instant when this error is a rate limit.
    pub fn rate_limit_reset(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        match self {
            Self::GitHub(GitHubError::RateLimited { reset_at }) => Some(*reset_at),
            _ => None,
        }
    }
}
