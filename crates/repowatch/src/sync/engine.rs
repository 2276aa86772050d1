//! Cycle driver: budget check, snapshot build, delta, store replacement.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::budget::{Budget, check_rate_budget};
use super::delta::{ChangeReport, compute_delta};
use super::error::SyncError;
use super::snapshot::{build_snapshots, resolve_repositories};
use super::store::SyncStore;
use super::types::{SnapshotMap, SyncOptions, WatchTarget};
use crate::cache::CacheMetrics;
use crate::github::GitHubClient;
use crate::rate_limit::time_until;

/// Result of one cycle.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The rate budget was exhausted; the store was not touched.
    Skipped { reset_at: DateTime<Utc> },
    /// The store now holds the cycle's snapshots.
    Completed { report: ChangeReport },
}

/// Snapshots fetched for a cycle.
#[derive(Debug, Clone)]
pub enum Fetched {
    Ready(SnapshotMap),
    Exhausted { reset_at: DateTime<Utc> },
}

/// Synchronizes one watch target against GitHub.
pub struct SyncEngine {
    client: GitHubClient,
    target: WatchTarget,
    options: SyncOptions,
    store: SyncStore,
    cache_metrics: Option<Arc<dyn CacheMetrics>>,
}

impl SyncEngine {
    pub fn new(client: GitHubClient, target: WatchTarget, options: SyncOptions) -> Self {
        Self {
            client,
            target,
            options,
            store: SyncStore::new(),
            cache_metrics: None,
        }
    }

    /// Log cache counters from `metrics` after each cycle.
    #[must_use]
    pub fn with_cache_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.cache_metrics = Some(metrics);
        self
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    pub fn store(&self) -> &SyncStore {
        &self.store
    }

    /// Fetch a fresh snapshot map for the target, using `previous` for issue
    /// watermarks.
    pub async fn fetch_snapshots(&self, previous: &SnapshotMap) -> Result<Fetched, SyncError> {
        if let Budget::Exhausted { reset_at } = check_rate_budget(&self.client).await? {
            return Ok(Fetched::Exhausted { reset_at });
        }

        let repos = resolve_repositories(&self.client, &self.target).await?;
        tracing::debug!(
            organization = %self.target.organization,
            repositories = repos.len(),
            "Resolved repositories"
        );

        let map = build_snapshots(
            &self.client,
            &self.target.organization,
            repos,
            previous,
            self.options.concurrency,
        )
        .await?;
        Ok(Fetched::Ready(map))
    }

    /// Seed the store with baseline snapshots.
    ///
    /// Returns the number of repositories stored, or `None` if the budget was
    /// exhausted and the store was left empty.
    pub async fn seed(&self) -> Result<Option<usize>, SyncError> {
        let fetched = self.fetch_snapshots(&SnapshotMap::new()).await;
        self.log_cache_stats();

        match fetched? {
            Fetched::Ready(map) => {
                let count = map.len();
                self.store.replace(map);
                tracing::info!(
                    organization = %self.target.organization,
                    repositories = count,
                    "Baseline snapshots stored"
                );
                Ok(Some(count))
            }
            Fetched::Exhausted { .. } => Ok(None),
        }
    }

    /// Run one cycle and replace the store on success.
    ///
    /// Rate limits, whether reported by the budget check or by an API
    /// response mid-cycle, yield [`CycleOutcome::Skipped`]. Any other error
    /// abandons the cycle. In both cases the store keeps its contents.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, SyncError> {
        let previous = self.store.snapshot();
        let fetched = self.fetch_snapshots(&previous).await;
        self.log_cache_stats();

        let next = match fetched {
            Ok(Fetched::Ready(next)) => next,
            Ok(Fetched::Exhausted { reset_at }) => return Ok(CycleOutcome::Skipped { reset_at }),
            Err(e) => match e.rate_limit_reset() {
                Some(reset_at) => {
                    tracing::warn!(
                        "Rate limited mid-cycle. Rate reset in {} at {}",
                        time_until(reset_at),
                        reset_at
                    );
                    return Ok(CycleOutcome::Skipped { reset_at });
                }
                None => return Err(e),
            },
        };

        let report = compute_delta(&previous, &next);
        self.store.replace(next);

        tracing::info!(
            organization = %self.target.organization,
            repositories = report.repositories,
            changed = report.changes.len(),
            new_issues = report.total_new_issues(),
            new_stargazers = report.total_new_stargazers(),
            "Cycle complete"
        );
        Ok(CycleOutcome::Completed { report })
    }

    fn log_cache_stats(&self) {
        if let Some(ref metrics) = self.cache_metrics {
            let stats = metrics.take_stats();
            tracing::debug!(
                cache_hits = stats.cache_hits,
                fetched = stats.fetched,
                hit_ratio = stats.hit_ratio(),
                "HTTP cache"
            );
        }
    }
}
