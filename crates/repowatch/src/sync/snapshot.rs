//! Per-repository snapshot construction.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use super::error::SyncError;
use super::types::{RepositoryIdentity, RepositorySnapshot, SnapshotMap, WatchTarget};
use crate::github::{GitHubClient, GitHubError, GitHubRepo};

/// Repositories covered by `target`, with their metadata.
pub async fn resolve_repositories(
    client: &GitHubClient,
    target: &WatchTarget,
) -> Result<Vec<GitHubRepo>, SyncError> {
    if target.organization.trim().is_empty() {
        return Err(SyncError::InvalidTarget(
            "organization name is empty".to_string(),
        ));
    }

    if target.is_whole_organization() {
        return Ok(client.list_org_repos(&target.organization).await?);
    }

    let mut repos = Vec::with_capacity(target.repositories.len());
    for name in &target.repositories {
        let identity = RepositoryIdentity::new(&target.organization, name)?;
        let mut repo = client.get_repo(&identity.organization, &identity.name).await?;
        if repo.name.is_empty() {
            repo.name = identity.name;
        }
        repos.push(repo);
    }
    Ok(repos)
}

/// Fetch issues and stargazers for one repository.
///
/// The issue threshold is `last_seen` (0 for a repository not seen before).
pub async fn build_snapshot(
    client: &GitHubClient,
    identity: &RepositoryIdentity,
    forks_count: u64,
    last_seen: u64,
    fetched_at: DateTime<Utc>,
) -> Result<RepositorySnapshot, GitHubError> {
    let issue_state = client
        .count_new_issues(&identity.organization, &identity.name, last_seen)
        .await?;
    let stargazers = client
        .list_stargazers(&identity.organization, &identity.name)
        .await?;

    tracing::debug!(
        repository = %identity,
        new_issues = issue_state.new_count_this_cycle,
        stargazers = stargazers.len(),
        forks = forks_count,
        "Built snapshot"
    );

    Ok(RepositorySnapshot {
        stargazers: stargazers.into_iter().collect::<BTreeSet<_>>(),
        forks_count,
        issue_state,
        fetched_at,
    })
}

/// Build a fresh snapshot map for `repos`, carrying issue watermarks from
/// `previous`.
///
/// All-or-nothing: the first failing repository aborts the remaining fetches
/// and no map is returned.
pub async fn build_snapshots(
    client: &GitHubClient,
    organization: &str,
    repos: Vec<GitHubRepo>,
    previous: &SnapshotMap,
    concurrency: usize,
) -> Result<SnapshotMap, SyncError> {
    let mut snapshots = SnapshotMap::new();
    if repos.is_empty() {
        return Ok(snapshots);
    }

    let concurrency = concurrency.clamp(1, repos.len());
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let fetched_at = Utc::now();

    let jobs = repos
        .into_iter()
        .map(|repo| -> Result<_, SyncError> {
            Ok((
                RepositoryIdentity::new(organization, repo.name)?,
                repo.forks_count,
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut handles = Vec::with_capacity(jobs.len());

    for (identity, forks_count) in jobs {
        let last_seen = previous
            .get(&identity.name)
            .map(|s| s.issue_state.last_seen_issue_number)
            .unwrap_or(0);
        let client = client.clone();
        let semaphore = Arc::clone(&semaphore);

        let handle = tokio::spawn(async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        identity,
                        Err(SyncError::internal("Semaphore closed unexpectedly")),
                    );
                }
            };

            let result = build_snapshot(&client, &identity, forks_count, last_seen, fetched_at)
                .await
                .map_err(SyncError::from);
            (identity, result)
        });

        handles.push(handle);
    }

    let mut pending = handles.into_iter();
    while let Some(handle) = pending.next() {
        let outcome = match handle.await {
            Ok((identity, Ok(snapshot))) => {
                snapshots.insert(identity.name, snapshot);
                continue;
            }
            Ok((identity, Err(e))) => {
                tracing::warn!(repository = %identity, error = %e, "Snapshot failed");
                e
            }
            Err(e) => SyncError::internal(format!("Snapshot task failed: {}", e)),
        };

        for handle in pending.by_ref() {
            handle.abort();
        }
        return Err(outcome);
    }

    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::PageWalk;
    use crate::http::{HttpMethod, HttpResponse, MockTransport};
    use crate::sync::IssueSyncState;

    const BASE: &str = "https://api.example";

    fn json(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn url(walk: PageWalk, page: u32) -> String {
        format!("{BASE}{}", walk.route(page))
    }

    fn mock_repo(mock: &MockTransport, name: &str, issues: &str, stars: &str) {
        mock.push_response(
            HttpMethod::Get,
            url(PageWalk::open_issues("acme", name), 1),
            json(issues),
        );
        mock.push_response(
            HttpMethod::Get,
            url(PageWalk::open_issues("acme", name), 2),
            json("[]"),
        );
        mock.push_response(
            HttpMethod::Get,
            url(PageWalk::stargazers("acme", name), 1),
            json(stars),
        );
        mock.push_response(
            HttpMethod::Get,
            url(PageWalk::stargazers("acme", name), 2),
            json("[]"),
        );
    }

    fn client(mock: &MockTransport) -> GitHubClient {
        GitHubClient::new_with_transport(BASE, Arc::new(mock.clone()), None)
    }

    fn repo(name: &str, forks: u64) -> GitHubRepo {
        GitHubRepo {
            name: name.to_string(),
            forks_count: forks,
        }
    }

    #[tokio::test]
    async fn builds_snapshots_and_carries_watermarks() {
        let mock = MockTransport::new();
        mock_repo(
            &mock,
            "widgets",
            r#"[{"number": 12}, {"number": 11}, {"number": 10}]"#,
            r#"[{"login": "bob"}, {"login": "alice"}]"#,
        );
        mock_repo(&mock, "gadgets", "[]", "[]");

        let mut previous = SnapshotMap::new();
        previous.insert(
            "widgets".to_string(),
            RepositorySnapshot {
                stargazers: BTreeSet::new(),
                forks_count: 0,
                issue_state: IssueSyncState {
                    last_seen_issue_number: 10,
                    new_count_this_cycle: 4,
                },
                fetched_at: Utc::now(),
            },
        );

        let map = build_snapshots(
            &client(&mock),
            "acme",
            vec![repo("widgets", 5), repo("gadgets", 0)],
            &previous,
            4,
        )
        .await
        .unwrap();

        let widgets = &map["widgets"];
        assert_eq!(widgets.forks_count, 5);
        assert_eq!(
            widgets.issue_state,
            IssueSyncState {
                last_seen_issue_number: 12,
                new_count_this_cycle: 2,
            }
        );
        assert_eq!(
            widgets.stargazers.iter().collect::<Vec<_>>(),
            vec!["alice", "bob"]
        );

        let gadgets = &map["gadgets"];
        assert_eq!(gadgets.issue_state, IssueSyncState::default());
        assert!(gadgets.stargazers.is_empty());
    }

    #[tokio::test]
    async fn one_failure_yields_no_map() {
        let mock = MockTransport::new();
        mock_repo(&mock, "widgets", "[]", "[]");
        // "broken" has no mocked routes, so its first request fails.

        let result = build_snapshots(
            &client(&mock),
            "acme",
            vec![repo("widgets", 1), repo("broken", 1)],
            &SnapshotMap::new(),
            1,
        )
        .await;

        assert!(matches!(result, Err(SyncError::GitHub(GitHubError::Http(_)))));
    }

    #[tokio::test]
    async fn empty_repository_name_is_rejected() {
        let mock = MockTransport::new();
        let result = build_snapshots(
            &client(&mock),
            "acme",
            vec![repo("", 0)],
            &SnapshotMap::new(),
            4,
        )
        .await;
        assert!(matches!(result, Err(SyncError::InvalidTarget(_))));
    }

    #[tokio::test]
    async fn resolve_named_repositories() {
        let mock = MockTransport::new();
        mock.push_response(
            HttpMethod::Get,
            format!("{BASE}/repos/acme/widgets"),
            json(r#"{"name": "widgets", "forks_count": 8}"#),
        );

        let target = WatchTarget::new("acme").with_repositories(["widgets"]);
        let repos = resolve_repositories(&client(&mock), &target).await.unwrap();
        assert_eq!(repos, vec![repo("widgets", 8)]);
    }

    #[tokio::test]
    async fn resolve_rejects_empty_organization() {
        let mock = MockTransport::new();
        let result = resolve_repositories(&client(&mock), &WatchTarget::new("")).await;
        assert!(matches!(result, Err(SyncError::InvalidTarget(_))));
        assert!(mock.requests().is_empty());
    }
}
