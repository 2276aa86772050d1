//! Bounded page walks over GitHub's paginated list endpoints.

use std::ops::ControlFlow;

use serde::de::DeserializeOwned;

use super::client::{GitHubClient, PAGE_SIZE};
use super::error::GitHubError;
use super::types::{GitHubIssue, GitHubRepo, Stargazer};
use crate::sync::IssueSyncState;

/// Route builder for a paginated endpoint.
pub struct PageWalk {
    /// Function to generate the route for a given page number (1-based).
    pub route_fn: Box<dyn Fn(u32) -> String + Send + Sync>,
}

impl PageWalk {
    pub fn new(route_fn: impl Fn(u32) -> String + Send + Sync + 'static) -> Self {
        Self {
            route_fn: Box::new(route_fn),
        }
    }

    /// `GET /orgs/{org}/repos`
    pub fn org_repos(org: &str) -> Self {
        let org = org.to_string();
        Self::new(move |page| format!("/orgs/{}/repos?per_page={}&page={}", org, PAGE_SIZE, page))
    }

    /// `GET /repos/{owner}/{repo}/issues`, newest first.
    pub fn open_issues(owner: &str, repo: &str) -> Self {
        let base = format!("/repos/{}/{}/issues", owner, repo);
        Self::new(move |page| {
            format!(
                "{}?state=open&sort=created&direction=desc&per_page={}&page={}",
                base, PAGE_SIZE, page
            )
        })
    }

    /// `GET /repos/{owner}/{repo}/stargazers`
    pub fn stargazers(owner: &str, repo: &str) -> Self {
        let base = format!("/repos/{}/{}/stargazers", owner, repo);
        Self::new(move |page| format!("{}?per_page={}&page={}", base, PAGE_SIZE, page))
    }

    pub fn route(&self, page: u32) -> String {
        (self.route_fn)(page)
    }
}

/// Running count of issues newer than a threshold.
///
/// The first counted item becomes the high-water mark; later items never
/// replace it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IssueTally {
    threshold: u64,
    count: u64,
    high_water: Option<u64>,
}

impl IssueTally {
    pub(crate) fn new(threshold: u64) -> Self {
        Self {
            threshold,
            count: 0,
            high_water: None,
        }
    }

    /// Count one page of issues, breaking at the first already-seen number.
    pub(crate) fn observe(&mut self, issues: &[GitHubIssue]) -> ControlFlow<()> {
        for issue in issues {
            if issue.number <= self.threshold {
                return ControlFlow::Break(());
            }
            self.high_water.get_or_insert(issue.number);
            self.count += 1;
        }
        ControlFlow::Continue(())
    }

    pub(crate) fn finish(self) -> IssueSyncState {
        IssueSyncState {
            last_seen_issue_number: self.high_water.unwrap_or(self.threshold),
            new_count_this_cycle: self.count,
        }
    }
}

impl GitHubClient {
    /// Fetch pages 1, 2, ... of `walk`, handing each non-empty page to `visit`.
    ///
    /// Stops at the first empty page or when `visit` breaks. Returns the
    /// number of pages requested. Fails with
    /// [`GitHubError::PageLimitExceeded`] if neither happens within
    /// [`max_pages`](GitHubClient::max_pages) requests.
    pub async fn walk_pages<T, F>(
        &self,
        walk: &PageWalk,
        mut visit: F,
    ) -> Result<u32, GitHubError>
    where
        T: DeserializeOwned + Send,
        F: FnMut(Vec<T>) -> ControlFlow<()> + Send,
    {
        for page in 1..=self.max_pages() {
            let route = walk.route(page);
            let items: Vec<T> = self.get(&route).await?;
            tracing::debug!(route = %route, items = items.len(), "Fetched page");

            if items.is_empty() || visit(items).is_break() {
                return Ok(page);
            }
        }

        Err(GitHubError::PageLimitExceeded {
            route: walk.route(1),
            max_pages: self.max_pages(),
        })
    }

    /// Count open issues numbered above `last_synced`.
    ///
    /// Listing is newest first, so the walk stops at the first issue at or
    /// below the threshold. When nothing new is found the threshold is carried
    /// forward unchanged.
    pub async fn count_new_issues(
        &self,
        owner: &str,
        repo: &str,
        last_synced: u64,
    ) -> Result<IssueSyncState, GitHubError> {
        let mut tally = IssueTally::new(last_synced);
        self.walk_pages(&PageWalk::open_issues(owner, repo), |page: Vec<GitHubIssue>| {
            tally.observe(&page)
        })
        .await?;
        Ok(tally.finish())
    }

    /// Every stargazer login of a repository, in listing order.
    pub async fn list_stargazers(&self, owner: &str, repo: &str) -> Result<Vec<String>, GitHubError> {
        let mut logins = Vec::new();
        self.walk_pages(&PageWalk::stargazers(owner, repo), |page: Vec<Stargazer>| {
            logins.extend(page.into_iter().map(|s| s.login));
            ControlFlow::Continue(())
        })
        .await?;
        Ok(logins)
    }

    /// All repositories of an organization, skipping entries without a name.
    pub async fn list_org_repos(&self, org: &str) -> Result<Vec<GitHubRepo>, GitHubError> {
        let mut repos = Vec::new();
        self.walk_pages(&PageWalk::org_repos(org), |page: Vec<GitHubRepo>| {
            repos.extend(page.into_iter().filter(|r| !r.name.is_empty()));
            ControlFlow::Continue(())
        })
        .await?;
        Ok(repos)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::{HttpMethod, HttpResponse, MockTransport};

    const BASE: &str = "https://api.example";

    fn json(body: String) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.into_bytes(),
        }
    }

    fn issues(numbers: &[u64]) -> HttpResponse {
        let items: Vec<String> = numbers
            .iter()
            .map(|n| format!(r#"{{"number": {n}, "title": "issue {n}"}}"#))
            .collect();
        json(format!("[{}]", items.join(",")))
    }

    fn issues_url(page: u32) -> String {
        format!(
            "{BASE}{}",
            PageWalk::open_issues("acme", "widgets").route(page)
        )
    }

    fn client(mock: &MockTransport) -> GitHubClient {
        GitHubClient::new_with_transport(BASE, Arc::new(mock.clone()), None)
    }

    #[test]
    fn routes_carry_paging_and_ordering() {
        assert_eq!(
            PageWalk::open_issues("acme", "widgets").route(3),
            "/repos/acme/widgets/issues?state=open&sort=created&direction=desc&per_page=100&page=3"
        );
        assert_eq!(
            PageWalk::stargazers("acme", "widgets").route(1),
            "/repos/acme/widgets/stargazers?per_page=100&page=1"
        );
        assert_eq!(
            PageWalk::org_repos("acme").route(2),
            "/orgs/acme/repos?per_page=100&page=2"
        );
    }

    #[test]
    fn tally_stops_at_threshold_and_keeps_first_number() {
        let mut tally = IssueTally::new(12);
        let flow = tally.observe(&[
            GitHubIssue { number: 50 },
            GitHubIssue { number: 49 },
            GitHubIssue { number: 48 },
            GitHubIssue { number: 12 },
        ]);
        assert!(flow.is_break());
        assert_eq!(
            tally.finish(),
            IssueSyncState {
                last_seen_issue_number: 50,
                new_count_this_cycle: 3,
            }
        );
    }

    #[test]
    fn tally_first_wins_even_when_later_numbers_are_larger() {
        let mut tally = IssueTally::new(0);
        assert!(tally.observe(&[GitHubIssue { number: 5 }]).is_continue());
        assert!(tally.observe(&[GitHubIssue { number: 9 }]).is_continue());
        let state = tally.finish();
        assert_eq!(state.last_seen_issue_number, 5);
        assert_eq!(state.new_count_this_cycle, 2);
    }

    #[test]
    fn tally_with_nothing_new_carries_threshold_forward() {
        let mut tally = IssueTally::new(40);
        assert!(tally.observe(&[GitHubIssue { number: 40 }]).is_break());
        assert_eq!(
            tally.finish(),
            IssueSyncState {
                last_seen_issue_number: 40,
                new_count_this_cycle: 0,
            }
        );
    }

    #[tokio::test]
    async fn count_new_issues_walks_until_threshold() {
        let mock = MockTransport::new();
        let first: Vec<u64> = (101..=200).rev().collect();
        mock.push_response(HttpMethod::Get, issues_url(1), issues(&first));
        mock.push_response(HttpMethod::Get, issues_url(2), issues(&[100, 99, 42, 41]));

        let state = client(&mock)
            .count_new_issues("acme", "widgets", 42)
            .await
            .unwrap();

        assert_eq!(state.new_count_this_cycle, 102);
        assert_eq!(state.last_seen_issue_number, 200);
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn count_new_issues_keeps_count_on_empty_page() {
        let mock = MockTransport::new();
        mock.push_response(HttpMethod::Get, issues_url(1), issues(&[3, 2, 1]));
        mock.push_response(HttpMethod::Get, issues_url(2), issues(&[]));

        let state = client(&mock)
            .count_new_issues("acme", "widgets", 0)
            .await
            .unwrap();

        assert_eq!(state.new_count_this_cycle, 3);
        assert_eq!(state.last_seen_issue_number, 3);
    }

    #[tokio::test]
    async fn count_new_issues_on_empty_repository() {
        let mock = MockTransport::new();
        mock.push_response(HttpMethod::Get, issues_url(1), issues(&[]));

        let state = client(&mock)
            .count_new_issues("acme", "widgets", 17)
            .await
            .unwrap();

        assert_eq!(state.new_count_this_cycle, 0);
        assert_eq!(state.last_seen_issue_number, 17);
    }

    #[tokio::test]
    async fn walk_without_empty_page_hits_page_limit() {
        let mock = MockTransport::new();
        for page in 1..=3 {
            let url = format!("{BASE}{}", PageWalk::stargazers("acme", "widgets").route(page));
            mock.always_respond(
                HttpMethod::Get,
                url,
                json(format!(r#"[{{"login": "user{page}"}}]"#)),
            );
        }

        let err = client(&mock)
            .with_max_pages(3)
            .list_stargazers("acme", "widgets")
            .await
            .unwrap_err();

        match err {
            GitHubError::PageLimitExceeded { route, max_pages } => {
                assert_eq!(max_pages, 3);
                assert!(route.starts_with("/repos/acme/widgets/stargazers"));
            }
            other => panic!("expected PageLimitExceeded, got {other:?}"),
        }
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn list_stargazers_accumulates_all_pages() {
        let mock = MockTransport::new();
        let url = |page| format!("{BASE}{}", PageWalk::stargazers("acme", "widgets").route(page));
        mock.push_response(
            HttpMethod::Get,
            url(1),
            json(r#"[{"login": "alice"}, {"login": "bob"}]"#.to_string()),
        );
        mock.push_response(
            HttpMethod::Get,
            url(2),
            json(r#"[{"login": "carol"}]"#.to_string()),
        );
        mock.push_response(HttpMethod::Get, url(3), json("[]".to_string()));

        let logins = client(&mock)
            .list_stargazers("acme", "widgets")
            .await
            .unwrap();
        assert_eq!(logins, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn list_org_repos_skips_unnamed_entries() {
        let mock = MockTransport::new();
        let url = |page| format!("{BASE}{}", PageWalk::org_repos("acme").route(page));
        mock.push_response(
            HttpMethod::Get,
            url(1),
            json(r#"[{"name": "widgets", "forks_count": 3}, {"name": ""}, {"forks_count": 9}]"#.to_string()),
        );
        mock.push_response(HttpMethod::Get, url(2), json("[]".to_string()));

        let repos = client(&mock).list_org_repos("acme").await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "widgets");
        assert_eq!(repos[0].forks_count, 3);
    }

    #[tokio::test]
    async fn walk_propagates_page_errors() {
        let mock = MockTransport::new();
        mock.push_response(
            HttpMethod::Get,
            issues_url(1),
            HttpResponse {
                status: 500,
                headers: Vec::new(),
                body: b"boom".to_vec(),
            },
        );

        let err = client(&mock)
            .count_new_issues("acme", "widgets", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::Api { status: 500, .. }));
    }
}
