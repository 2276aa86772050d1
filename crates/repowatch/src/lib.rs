//! Repowatch - periodic change tracking for GitHub organizations.
//!
//! Each cycle records stargazers, fork counts and open-issue watermarks for
//! the watched repositories and reports what changed since the previous cycle.
//! Requests go through an ETag-revalidating cache so unchanged listings are
//! answered with `304 Not Modified`.
//!
//! # Example
//!
//! ```ignore
//! use repowatch::Watcher;
//!
//! let mut watcher = Watcher::new();
//! watcher.set_organization("rust-lang");
//! watcher.on_report(|report| println!("{} repositories changed", report.changes.len()));
//!
//! let job = watcher.schedule("@every 30m")?;
//! job.run_and_hold().await?;
//! ```

pub mod cache;
pub mod github;
pub mod http;
pub mod rate_limit;
pub mod sync;
pub mod watcher;

pub use cache::{CacheStats, CachingTransport, MemoryCache, ResponseCache};
pub use github::{GitHubClient, GitHubError};
pub use http::{HttpError, HttpTransport};
pub use rate_limit::{ApiRateLimiter, RateLimitInfo, format_duration};
pub use sync::{
    ChangeKind, ChangeReport, CycleOutcome, RepositoryChange, RepositorySnapshot, SnapshotMap,
    SyncEngine, SyncError, WatchTarget,
};
pub use watcher::{JobState, ReportCallback, Schedule, WatchError, WatchJob, Watcher};
