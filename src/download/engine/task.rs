use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::DownloadStats;
use crate::discovery::FileLink;
use crate::download::client::{FetchOutcome, FileFetcher};
use crate::download::progress::{ProgressObserver, TaskProgress};
use crate::download::retry::{RetryDecision, RetryPolicy, classify_error};

/// Lifecycle status of one download task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet admitted to a worker.
    Pending,
    /// An attempt is in progress.
    InFlight,
    /// The file was written completely.
    Succeeded,
    /// A file already existed at the destination path.
    Skipped,
    /// The retry ceiling was reached or a permanent error occurred.
    Failed,
    /// Abandoned because the run was cancelled.
    Cancelled,
}

impl TaskStatus {
    /// Returns true for statuses a task never leaves.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Skipped | Self::Failed | Self::Cancelled
        )
    }

    /// Returns the lowercase label used in summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Succeeded => "succeeded",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file's download lifecycle within a job.
///
/// Status changes go through [`DownloadTask::transition`], which refuses to
/// leave a terminal status.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    index: usize,
    link: FileLink,
    destination: PathBuf,
    attempts: u32,
    status: TaskStatus,
    last_error: Option<String>,
}

impl DownloadTask {
    /// Creates a pending task writing `link` into `destination_dir`.
    #[must_use]
    pub fn new(index: usize, link: FileLink, destination_dir: &Path) -> Self {
        let destination = destination_dir.join(link.file_name());
        Self {
            index,
            link,
            destination,
            attempts: 0,
            status: TaskStatus::Pending,
            last_error: None,
        }
    }

    /// Position of the link in the input list.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The link being downloaded.
    #[must_use]
    pub fn link(&self) -> &FileLink {
        &self.link
    }

    /// Final path of the local copy.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Number of attempts started.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Text of the error that ended the last failed attempt.
    ///
    /// Cleared once an attempt succeeds.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Moves to `next` unless the task is already terminal. Returns whether
    /// the status changed.
    pub(crate) fn transition(&mut self, next: TaskStatus) -> bool {
        if self.status.is_terminal() {
            warn!(
                index = self.index,
                from = %self.status,
                to = %next,
                "ignoring transition out of terminal status"
            );
            return false;
        }
        self.status = next;
        true
    }

    fn begin_attempt(&mut self) {
        if self.transition(TaskStatus::InFlight) {
            self.attempts += 1;
        }
    }
}

/// Shared per-job context handed to each task runner.
pub(super) struct TaskContext<'a> {
    pub fetcher: &'a dyn FileFetcher,
    pub policy: &'a RetryPolicy,
    pub cancel: &'a CancellationToken,
    pub stats: &'a DownloadStats,
    pub observer: &'a dyn ProgressObserver,
}

/// Drives one task from Pending to a terminal status.
#[instrument(skip_all, fields(index = task.index, url = %task.link))]
pub(super) async fn run_task(task: &mut DownloadTask, ctx: &TaskContext<'_>) {
    if destination_exists(&task.destination).await {
        info!(file = task.link.file_name(), "file already exists, skipping");
        task.transition(TaskStatus::Skipped);
        return;
    }

    loop {
        if ctx.cancel.is_cancelled() {
            task.transition(TaskStatus::Cancelled);
            return;
        }

        task.begin_attempt();
        let attempt = task.attempts;
        info!(attempt, file = task.link.file_name(), "starting download");

        let progress = TaskProgress::new(ctx.observer, task.index, task.link.file_name(), attempt);
        let result = ctx
            .fetcher
            .fetch(&task.link, &task.destination, ctx.cancel, &progress)
            .await;

        let error = match result {
            Ok(FetchOutcome::Completed { bytes }) => {
                debug!(attempt, bytes, "attempt succeeded");
                task.last_error = None;
                task.transition(TaskStatus::Succeeded);
                return;
            }
            Ok(FetchOutcome::Cancelled { bytes }) => {
                debug!(attempt, bytes, "attempt cancelled");
                task.transition(TaskStatus::Cancelled);
                return;
            }
            Err(error) => error,
        };

        warn!(attempt, error = %error, "download attempt failed");
        task.last_error = Some(error.to_string());

        match ctx.policy.should_retry(classify_error(&error), attempt) {
            RetryDecision::Retry { delay, attempt: next_attempt } => {
                info!(
                    next_attempt,
                    max_attempts = ctx.policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    "retrying download"
                );
                ctx.stats.increment_retried();
                tokio::select! {
                    biased;
                    () = ctx.cancel.cancelled() => {
                        task.transition(TaskStatus::Cancelled);
                        return;
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
            RetryDecision::DoNotRetry { reason } => {
                warn!(attempts = attempt, %reason, "download failed");
                task.transition(TaskStatus::Failed);
                return;
            }
        }
    }
}

/// Returns whether a file is already at `path`. An unreadable path counts as
/// absent so the attempt itself reports the real problem.
async fn destination_exists(path: &Path) -> bool {
    match tokio::fs::try_exists(path).await {
        Ok(exists) => exists,
        Err(error) => {
            warn!(
                path = %path.display(),
                error = %error,
                "could not check for an existing file, downloading anyway"
            );
            false
        }
    }
}
