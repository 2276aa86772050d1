use thiserror::Error;

/// Errors that prevent a watch job from being scheduled or started.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Must provide organization name")]
    MissingOrganization,

    #[error("Must provide cron expression")]
    MissingSchedule,

    #[error("Invalid schedule '{expr}': {reason}")]
    InvalidSchedule { expr: String, reason: String },

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl WatchError {
    pub(crate) fn invalid(expr: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}
