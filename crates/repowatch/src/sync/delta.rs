//! Differences between two snapshot maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{RepositorySnapshot, SnapshotMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Updated,
}

/// Change of one repository between two cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryChange {
    pub repository: String,
    pub kind: ChangeKind,
    pub stargazers_added: Vec<String>,
    pub stargazers_removed: Vec<String>,
    pub new_issues: u64,
    pub forks_delta: i64,
}

impl RepositoryChange {
    fn is_noop(&self) -> bool {
        self.stargazers_added.is_empty()
            && self.stargazers_removed.is_empty()
            && self.new_issues == 0
            && self.forks_delta == 0
    }
}

/// Changes between two cycles, ordered by repository name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub generated_at: DateTime<Utc>,
    pub repositories: usize,
    pub changes: Vec<RepositoryChange>,
}

impl ChangeReport {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn total_new_issues(&self) -> u64 {
        self.changes.iter().map(|c| c.new_issues).sum()
    }

    pub fn total_new_stargazers(&self) -> usize {
        self.changes.iter().map(|c| c.stargazers_added.len()).sum()
    }
}

fn forks_delta(old: u64, new: u64) -> i64 {
    let signed = |n: u64| i64::try_from(n).unwrap_or(i64::MAX);
    signed(new).saturating_sub(signed(old))
}

fn diff(
    name: &str,
    old: Option<&RepositorySnapshot>,
    new: Option<&RepositorySnapshot>,
) -> Option<RepositoryChange> {
    let change = match (old, new) {
        (None, Some(new)) => RepositoryChange {
            repository: name.to_string(),
            kind: ChangeKind::Added,
            stargazers_added: new.stargazers.iter().cloned().collect(),
            stargazers_removed: Vec::new(),
            new_issues: new.issue_state.new_count_this_cycle,
            forks_delta: forks_delta(0, new.forks_count),
        },
        (Some(old), None) => RepositoryChange {
            repository: name.to_string(),
            kind: ChangeKind::Removed,
            stargazers_added: Vec::new(),
            stargazers_removed: old.stargazers.iter().cloned().collect(),
            new_issues: 0,
            forks_delta: forks_delta(old.forks_count, 0),
        },
        (Some(old), Some(new)) => {
            let change = RepositoryChange {
                repository: name.to_string(),
                kind: ChangeKind::Updated,
                stargazers_added: new.stargazers.difference(&old.stargazers).cloned().collect(),
                stargazers_removed: old.stargazers.difference(&new.stargazers).cloned().collect(),
                new_issues: new.issue_state.new_count_this_cycle,
                forks_delta: forks_delta(old.forks_count, new.forks_count),
            };
            if change.is_noop() {
                return None;
            }
            change
        }
        (None, None) => return None,
    };
    Some(change)
}

/// Compare `old` and `new` without modifying either.
pub fn compute_delta(old: &SnapshotMap, new: &SnapshotMap) -> ChangeReport {
    let mut names: Vec<&String> = old.keys().chain(new.keys()).collect();
    names.sort();
    names.dedup();

    let changes = names
        .into_iter()
        .filter_map(|name| diff(name, old.get(name), new.get(name)))
        .collect();

    ChangeReport {
        generated_at: Utc::now(),
        repositories: new.len(),
        changes,
    }
}
