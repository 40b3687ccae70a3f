//! Download engine: bounded worker pool with retry, skip and cancellation.
//!
//! # Overview
//!
//! [`DownloadEngine::run`] turns an ordered list of [`FileLink`]s into local
//! files. Tasks are admitted in input order, each holding one of
//! `concurrency` semaphore permits for its whole retry loop and the courtesy
//! pause that follows. Completion order is unconstrained.
//!
//! Each destination path is claimed by the first task that maps to it. Later
//! tasks with the same path become [`TaskStatus::Skipped`] without an attempt,
//! so two links sharing a file name never write the same `.part` file.
//!
//! Cancellation is cooperative. Once the token fires, no further task is
//! admitted and every task not yet admitted becomes
//! [`TaskStatus::Cancelled`]. Tasks already running settle on their own, and
//! `run` joins all of them before returning.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use iadl_core::discovery::FileLink;
//! use iadl_core::download::{DownloadEngine, HttpClient, NoopProgress, RetryPolicy};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(4, RetryPolicy::default(), Duration::from_secs(1))?;
//! let links = vec![FileLink::parse("https://archive.org/download/item/a.mp4")?];
//! let report = engine
//!     .run(
//!         links,
//!         Path::new("./downloads"),
//!         Arc::new(HttpClient::new()?),
//!         CancellationToken::new(),
//!         Arc::new(NoopProgress),
//!     )
//!     .await?;
//! println!("succeeded: {}", report.summary.succeeded);
//! # Ok(())
//! # }
//! ```

mod task;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use task::{DownloadTask, TaskStatus};

use self::task::{TaskContext, run_task};
use super::client::FileFetcher;
use super::constants::DEFAULT_COURTESY_DELAY;
use super::progress::ProgressObserver;
use super::retry::RetryPolicy;
use crate::discovery::FileLink;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Default concurrency (fully sequential).
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Errors that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The destination directory cannot be created or written.
    #[error("destination directory {path} is unusable: {source}")]
    Destination {
        /// The destination directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

impl EngineError {
    fn destination(path: &Path, source: std::io::Error) -> Self {
        Self::Destination {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Counters for one run.
///
/// Atomic so concurrent tasks can tally without a lock.
#[derive(Debug, Default)]
pub struct DownloadStats {
    succeeded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
    retried: AtomicUsize,
    interrupted: AtomicBool,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of files written.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Returns the number of files skipped because they already existed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Returns the number of failed files.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of cancelled files.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the number of retry attempts made.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Returns true if the run was interrupted.
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Tallies one task that reached `status`.
    fn record(&self, status: TaskStatus) {
        let counter = match status {
            TaskStatus::Succeeded => &self.succeeded,
            TaskStatus::Skipped => &self.skipped,
            TaskStatus::Failed => &self.failed,
            TaskStatus::Cancelled => &self.cancelled,
            TaskStatus::Pending | TaskStatus::InFlight => {
                warn!(%status, "non-terminal status reported as finished");
                return;
            }
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    fn set_interrupted(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    /// Copies the current counters into a plain summary.
    #[must_use]
    pub fn snapshot(&self) -> JobSummary {
        JobSummary {
            succeeded: self.succeeded(),
            skipped: self.skipped(),
            failed: self.failed(),
            cancelled: self.cancelled(),
            retried: self.retried(),
            interrupted: self.was_interrupted(),
        }
    }
}

/// Final counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    /// Files written.
    pub succeeded: usize,
    /// Files that already existed.
    pub skipped: usize,
    /// Files that failed.
    pub failed: usize,
    /// Files abandoned on cancellation.
    pub cancelled: usize,
    /// Retry attempts performed across all files.
    pub retried: usize,
    /// Whether cancellation was requested during the run.
    pub interrupted: bool,
}

impl JobSummary {
    /// Total number of tasks accounted for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed + self.cancelled
    }
}

/// Result of [`DownloadEngine::run`]: counts plus every task in input order.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Aggregate counts.
    pub summary: JobSummary,
    /// Terminal tasks, sorted by input index.
    pub tasks: Vec<DownloadTask>,
}

/// Download engine for concurrent file downloads with retry support.
///
/// # Concurrency Model
///
/// - Each admitted task runs in its own Tokio task
/// - A semaphore permit is acquired before admitting each task
/// - The permit is held through retries and the courtesy pause, then released (RAII)
/// - Admission races against the cancellation token
#[derive(Debug, Clone)]
pub struct DownloadEngine {
    concurrency: usize,
    retry_policy: RetryPolicy,
    courtesy_delay: Duration,
}

impl DownloadEngine {
    /// Creates a new engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if `concurrency` is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use iadl_core::download::{DownloadEngine, RetryPolicy};
    ///
    /// let engine = DownloadEngine::new(4, RetryPolicy::default(), Duration::ZERO).unwrap();
    /// assert_eq!(engine.concurrency(), 4);
    /// ```
    #[instrument(level = "debug", skip(retry_policy))]
    pub fn new(
        concurrency: usize,
        retry_policy: RetryPolicy,
        courtesy_delay: Duration,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = retry_policy.max_attempts(),
            backoff_ms = retry_policy.backoff().as_millis(),
            courtesy_delay_ms = courtesy_delay.as_millis(),
            "creating download engine"
        );

        Ok(Self {
            concurrency,
            retry_policy,
            courtesy_delay,
        })
    }

    /// Creates an engine with default retry policy and courtesy delay.
    ///
    /// # Errors
    ///
    /// Same as [`DownloadEngine::new`].
    pub fn with_concurrency(concurrency: usize) -> Result<Self, EngineError> {
        Self::new(concurrency, RetryPolicy::default(), DEFAULT_COURTESY_DELAY)
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the pause a worker takes after each finished task.
    #[must_use]
    pub fn courtesy_delay(&self) -> Duration {
        self.courtesy_delay
    }

    /// Downloads every link into `destination`.
    ///
    /// Individual download failures do not make this method fail; they are
    /// recorded on the task and counted in the summary. The returned report
    /// always accounts for every input link.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Destination`] before any task starts if the
    /// directory cannot be created or is not a writable directory.
    #[instrument(skip(self, links, fetcher, cancel, observer), fields(
        destination = %destination.display(),
        links = links.len(),
        concurrency = self.concurrency
    ))]
    pub async fn run(
        &self,
        links: Vec<FileLink>,
        destination: &Path,
        fetcher: Arc<dyn FileFetcher>,
        cancel: CancellationToken,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<JobReport, EngineError> {
        prepare_destination(destination).await?;

        let stats = Arc::new(DownloadStats::new());
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles: Vec<(DownloadTask, tokio::task::JoinHandle<DownloadTask>)> = Vec::new();
        let mut finished: Vec<DownloadTask> = Vec::with_capacity(links.len());
        let mut claimed: HashSet<PathBuf> = HashSet::with_capacity(links.len());

        info!("starting downloads");

        let mut pending = links
            .into_iter()
            .enumerate()
            .map(|(index, link)| DownloadTask::new(index, link, destination));

        for mut task in pending.by_ref() {
            if !claimed.insert(task.destination().to_path_buf()) {
                info!(
                    index = task.index(),
                    url = %task.link(),
                    path = %task.destination().display(),
                    "destination already claimed by an earlier link, skipping"
                );
                task.transition(TaskStatus::Skipped);
                stats.record(TaskStatus::Skipped);
                observer.task_finished(task.index(), task.link().file_name(), TaskStatus::Skipped);
                finished.push(task);
                continue;
            }

            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    Some(permit.map_err(|_| EngineError::SemaphoreClosed)?)
                }
            };
            let Some(permit) = permit else {
                stats.set_interrupted();
                cancel_unadmitted(&mut task, stats.as_ref(), observer.as_ref());
                finished.push(task);
                break;
            };

            debug!(index = task.index(), url = %task.link(), "admitting task");

            let snapshot = task.clone();
            let fetcher = Arc::clone(&fetcher);
            let observer = Arc::clone(&observer);
            let stats = Arc::clone(&stats);
            let cancel = cancel.clone();
            let policy = self.retry_policy.clone();
            let courtesy_delay = self.courtesy_delay;

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let ctx = TaskContext {
                    fetcher: fetcher.as_ref(),
                    policy: &policy,
                    cancel: &cancel,
                    stats: stats.as_ref(),
                    observer: observer.as_ref(),
                };
                run_task(&mut task, &ctx).await;

                let status = task.status();
                stats.record(status);
                observer.task_finished(task.index(), task.link().file_name(), status);

                if status != TaskStatus::Cancelled && !courtesy_delay.is_zero() {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {}
                        () = tokio::time::sleep(courtesy_delay) => {}
                    }
                }
                task
            });
            handles.push((snapshot, handle));
        }

        for mut task in pending {
            cancel_unadmitted(&mut task, stats.as_ref(), observer.as_ref());
            finished.push(task);
        }

        debug!(task_count = handles.len(), "waiting for downloads to settle");

        for (mut snapshot, handle) in handles {
            match handle.await {
                Ok(task) => finished.push(task),
                Err(e) => {
                    warn!(index = snapshot.index(), error = %e, "download task panicked");
                    snapshot.transition(TaskStatus::Failed);
                    stats.record(TaskStatus::Failed);
                    finished.push(snapshot);
                }
            }
        }

        if cancel.is_cancelled() {
            stats.set_interrupted();
        }

        finished.sort_by_key(DownloadTask::index);
        let summary = stats.snapshot();
        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            retried = summary.retried,
            interrupted = summary.interrupted,
            "downloads finished"
        );

        Ok(JobReport {
            summary,
            tasks: finished,
        })
    }
}

fn cancel_unadmitted(
    task: &mut DownloadTask,
    stats: &DownloadStats,
    observer: &dyn ProgressObserver,
) {
    task.transition(TaskStatus::Cancelled);
    stats.record(TaskStatus::Cancelled);
    observer.task_finished(task.index(), task.link().file_name(), TaskStatus::Cancelled);
}

/// Creates `destination` if needed and checks that it is a writable directory.
async fn prepare_destination(destination: &Path) -> Result<(), EngineError> {
    tokio::fs::create_dir_all(destination)
        .await
        .map_err(|e| EngineError::destination(destination, e))?;

    let metadata = tokio::fs::metadata(destination)
        .await
        .map_err(|e| EngineError::destination(destination, e))?;
    if !metadata.is_dir() {
        return Err(EngineError::destination(
            destination,
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }
    if metadata.permissions().readonly() {
        return Err(EngineError::destination(
            destination,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "directory is read-only"),
        ));
    }
    info!(path = %destination.display(), "destination folder ready");
    Ok(())
}
