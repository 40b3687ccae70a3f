//! Per-task progress observation.
//!
//! Observers are informational only. Their methods return nothing, so a
//! broken progress display can never change how a task is classified.

use super::TaskStatus;

/// Receives progress events for the tasks of one job.
///
/// Every method has an empty default so observers implement only what they show.
pub trait ProgressObserver: Send + Sync {
    /// A new attempt for task `index` received a response. `total_bytes` is the
    /// declared content length, when the server sent one.
    fn attempt_started(&self, index: usize, file_name: &str, attempt: u32, total_bytes: Option<u64>) {
        let _ = (index, file_name, attempt, total_bytes);
    }

    /// Task `index` has written `bytes_written` bytes in its current attempt.
    fn bytes_written(&self, index: usize, bytes_written: u64) {
        let _ = (index, bytes_written);
    }

    /// Task `index` reached a terminal status.
    fn task_finished(&self, index: usize, file_name: &str, status: TaskStatus) {
        let _ = (index, file_name, status);
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {}

/// Progress handle for one attempt of one task, handed to a [`FileFetcher`](super::FileFetcher).
pub struct TaskProgress<'a> {
    observer: &'a dyn ProgressObserver,
    index: usize,
    file_name: &'a str,
    attempt: u32,
}

impl<'a> TaskProgress<'a> {
    /// Creates a handle that forwards to `observer` for task `index`.
    #[must_use]
    pub fn new(
        observer: &'a dyn ProgressObserver,
        index: usize,
        file_name: &'a str,
        attempt: u32,
    ) -> Self {
        Self {
            observer,
            index,
            file_name,
            attempt,
        }
    }

    /// Reports that the response arrived with an optional declared size.
    pub fn start(&self, total_bytes: Option<u64>) {
        self.observer
            .attempt_started(self.index, self.file_name, self.attempt, total_bytes);
    }

    /// Reports the running byte count of the current attempt.
    pub fn advance(&self, bytes_written: u64) {
        self.observer.bytes_written(self.index, bytes_written);
    }
}

impl std::fmt::Debug for TaskProgress<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskProgress")
            .field("index", &self.index)
            .field("file_name", &self.file_name)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

const SIZE_UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

/// Formats a byte count with binary units and two decimals, e.g. `1.50 MB`.
///
/// ```
/// use iadl_core::download::human_readable_size;
///
/// assert_eq!(human_readable_size(512), "512.00 B");
/// assert_eq!(human_readable_size(1536), "1.50 KB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_readable_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in SIZE_UNITS {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{:.2} EB", size * 1024.0)
}
