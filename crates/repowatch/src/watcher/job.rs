//! Scheduled watch job.

use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::ReportCallback;
use super::error::WatchError;
use super::schedule::Schedule;
use crate::github::short_error_message;
use crate::rate_limit::time_until;
use crate::sync::{ChangeReport, CycleOutcome, SyncEngine, SyncStore};

/// Lifecycle of a [`WatchJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Uninitialized,
    Initialized,
    Waiting,
    Running,
    Stopped,
}

struct JobInner {
    engine: SyncEngine,
    schedule: Schedule,
    on_report: Option<ReportCallback>,
    state: Mutex<JobState>,
    /// Set once the baseline pass has run. Held across the pass so
    /// concurrent callers wait for it instead of starting another.
    initialized: tokio::sync::Mutex<bool>,
    /// Serializes cycles.
    cycle: tokio::sync::Mutex<()>,
    stop_tx: watch::Sender<bool>,
}

impl JobInner {
    fn state(&self) -> JobState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move to `next` unless the job has stopped.
    fn transition(&self, next: JobState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != JobState::Stopped {
            *state = next;
        }
    }

    fn mark_stopped(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = JobState::Stopped;
    }

    async fn initialize(&self) -> bool {
        let mut done = self.initialized.lock().await;
        if *done {
            return false;
        }

        let organization = &self.engine.target().organization;
        match self.engine.seed().await {
            Ok(Some(count)) => {
                tracing::info!(
                    organization = %organization,
                    repositories = count,
                    "Watch job initialized"
                );
            }
            Ok(None) => {
                tracing::warn!(
                    organization = %organization,
                    "Skipped baseline; the first cycle will seed the store"
                );
            }
            Err(e) => match e.rate_limit_reset() {
                Some(reset_at) => tracing::warn!(
                    "Hit rate limit. Rate reset in {} at {}",
                    time_until(reset_at),
                    reset_at
                ),
                None => tracing::warn!(
                    organization = %organization,
                    error = %short_error_message(&e),
                    "Baseline failed; the first cycle will seed the store"
                ),
            },
        }

        *done = true;
        self.transition(JobState::Initialized);
        true
    }

    async fn run_cycle(&self) -> Option<ChangeReport> {
        let _cycle = self.cycle.lock().await;
        self.transition(JobState::Running);

        let report = match self.engine.run_cycle().await {
            Ok(CycleOutcome::Completed { report }) => {
                if let Some(ref on_report) = self.on_report {
                    on_report(&report);
                }
                Some(report)
            }
            Ok(CycleOutcome::Skipped { reset_at }) => {
                tracing::info!(reset_at = %reset_at, "Cycle skipped");
                None
            }
            Err(e) => {
                tracing::warn!(error = %short_error_message(&e), "Cycle abandoned");
                None
            }
        };

        self.transition(JobState::Waiting);
        report
    }

    async fn run_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let stopped = *stop_rx.borrow();
        if !stopped {
            self.initialize().await;
        }

        loop {
            let stopped = *stop_rx.borrow();
            if stopped {
                break;
            }
            self.transition(JobState::Waiting);

            let Some(delay) = self.schedule.next_delay(Utc::now()) else {
                tracing::warn!(schedule = %self.schedule, "Schedule has no upcoming fire time");
                break;
            };
            tracing::debug!(delay_secs = delay.as_secs(), "Waiting for next cycle");

            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            self.run_cycle().await;
        }

        self.mark_stopped();
        tracing::info!(schedule = %self.schedule, "Watch job stopped");
    }
}

/// A watch job bound to a schedule.
///
/// Created by [`Watcher::schedule`](super::Watcher::schedule). Nothing runs
/// until [`start`](WatchJob::start) arms the timer task; that task seeds the
/// store once and then runs one cycle per fire. Cycles never overlap and
/// fire times missed during a long cycle are skipped.
pub struct WatchJob {
    inner: Arc<JobInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WatchJob {
    pub(crate) fn new(
        engine: SyncEngine,
        schedule: Schedule,
        on_report: Option<ReportCallback>,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(JobInner {
                engine,
                schedule,
                on_report,
                state: Mutex::new(JobState::Uninitialized),
                initialized: tokio::sync::Mutex::new(false),
                cycle: tokio::sync::Mutex::new(()),
                stop_tx,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> JobState {
        self.inner.state()
    }

    pub fn schedule(&self) -> &Schedule {
        &self.inner.schedule
    }

    pub fn store(&self) -> &SyncStore {
        self.inner.engine.store()
    }

    /// Run the baseline pass if it has not run yet.
    ///
    /// Returns `true` for the call that performed it.
    pub async fn initialize(&self) -> bool {
        self.inner.initialize().await
    }

    /// Run one cycle now, after any cycle already in progress.
    pub async fn run_now(&self) -> Option<ChangeReport> {
        self.inner.initialize().await;
        self.inner.run_cycle().await
    }

    /// Arm the timer task on the current tokio runtime.
    pub fn start(&self) -> Result<(), WatchError> {
        if self.state() == JobState::Stopped {
            return Err(WatchError::Runtime("watch job is stopped".to_string()));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| WatchError::Runtime(e.to_string()))?;

        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() {
            return Err(WatchError::Runtime("watch job already started".to_string()));
        }

        let stop_rx = self.inner.stop_tx.subscribe();
        tracing::info!(schedule = %self.inner.schedule, "Starting watch job");
        *task = Some(runtime.spawn(Arc::clone(&self.inner).run_loop(stop_rx)));
        Ok(())
    }

    /// Stop firing. A cycle already running finishes first.
    pub fn stop(&self) {
        self.inner.stop_tx.send_replace(true);
        self.inner.mark_stopped();
    }

    /// Wait for the timer task to exit.
    pub async fn wait(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Watch task ended abnormally");
        }
    }

    /// Start the job, run until `shutdown` resolves, then stop it.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), WatchError>
    where
        F: Future<Output = ()>,
    {
        self.start()?;
        shutdown.await;
        self.stop();
        self.wait().await;
        Ok(())
    }

    /// Start the job and hold until Ctrl+C.
    pub async fn run_and_hold(&self) -> Result<(), WatchError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            }
        })
        .await
    }
}

impl Drop for WatchJob {
    fn drop(&mut self) {
        self.inner.stop_tx.send_replace(true);
    }
}
