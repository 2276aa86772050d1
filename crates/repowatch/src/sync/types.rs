//! Sync data model.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SyncError;

/// Default number of repositories fetched concurrently.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// A repository within an organization scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub organization: String,
    pub name: String,
}

impl RepositoryIdentity {
    /// Both parts must be non-empty.
    pub fn new(organization: impl Into<String>, name: impl Into<String>) -> Result<Self, SyncError> {
        let organization = organization.into();
        let name = name.into();
        if organization.trim().is_empty() {
            return Err(SyncError::InvalidTarget(
                "organization name is empty".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(SyncError::InvalidTarget(format!(
                "empty repository name in {}",
                organization
            )));
        }
        Ok(Self { organization, name })
    }
}

impl std::fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.organization, self.name)
    }
}

/// What to watch: one organization, optionally narrowed to named repositories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchTarget {
    pub organization: String,
    /// Empty means every repository of the organization.
    #[serde(default)]
    pub repositories: Vec<String>,
}

impl WatchTarget {
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            repositories: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_repositories<I, S>(mut self, repositories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repositories
            .extend(repositories.into_iter().map(Into::into));
        self
    }

    pub fn is_whole_organization(&self) -> bool {
        self.repositories.is_empty()
    }
}

/// Issue watermark of one repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSyncState {
    /// Highest issue number already accounted for. Never decreases.
    pub last_seen_issue_number: u64,
    /// Issues counted above the previous watermark during this cycle.
    pub new_count_this_cycle: u64,
}

/// State of one repository computed during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    pub stargazers: BTreeSet<String>,
    pub forks_count: u64,
    pub issue_state: IssueSyncState,
    pub fetched_at: DateTime<Utc>,
}

/// Snapshots keyed by repository name.
pub type SnapshotMap = BTreeMap<String, RepositorySnapshot>;

/// Options for a sync cycle.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum repositories fetched at once.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}
