//! Repository synchronization.
//!
//! A cycle checks the rate budget, resolves the watched repositories, builds
//! a fresh [`RepositorySnapshot`] for each of them, diffs the result against
//! the previous cycle and swaps it into the [`SyncStore`].
//!
//! # Module Structure
//!
//! - [`types`] - Data model: `RepositoryIdentity`, `RepositorySnapshot`, `SnapshotMap`
//! - [`budget`] - Rate budget gate: `Budget`, `check_rate_budget()`
//! - [`snapshot`] - Snapshot builder: `resolve_repositories()`, `build_snapshots()`
//! - [`delta`] - Delta reporter: `ChangeReport`, `compute_delta()`
//! - [`engine`] - Cycle driver: `SyncEngine`
//!
//! # Example
//!
//! ```ignore
//! use repowatch::sync::{CycleOutcome, SyncEngine, SyncOptions, WatchTarget};
//!
//! let engine = SyncEngine::new(client, WatchTarget::new("rust-lang"), SyncOptions::default());
//! engine.seed().await?;
//! if let CycleOutcome::Completed { report } = engine.run_cycle().await? {
//!     println!("{} repositories changed", report.changes.len());
//! }
//! ```

pub mod budget;
pub mod delta;
pub mod engine;
mod error;
pub mod snapshot;
mod store;
pub mod types;

pub use budget::{Budget, check_rate_budget};
pub use delta::{ChangeKind, ChangeReport, RepositoryChange, compute_delta};
pub use engine::{CycleOutcome, Fetched, SyncEngine};
pub use error::SyncError;
pub use snapshot::{build_snapshot, build_snapshots, resolve_repositories};
pub use store::SyncStore;
pub use types::{
    DEFAULT_CONCURRENCY, IssueSyncState, RepositoryIdentity, RepositorySnapshot, SnapshotMap,
    SyncOptions, WatchTarget,
};
