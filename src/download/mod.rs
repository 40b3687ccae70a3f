//! Download orchestration: streaming file fetcher plus bounded worker pool.
//!
//! # Features
//!
//! - Streaming downloads into `<name>.part`, renamed once complete
//! - Skip when the destination file already exists
//! - Fixed-backoff retry of transient failures up to a ceiling
//! - Cooperative cancellation through a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - Per-task progress events through [`ProgressObserver`]
//! - Structured error types with full context
//!
//! See [`DownloadEngine`] for an end-to-end example.

mod client;
mod constants;
mod engine;
mod error;
mod progress;
mod retry;

pub use client::{FetchOutcome, FileFetcher, HttpClient, part_path_for};
pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_COURTESY_DELAY, DEFAULT_RETRY_BACKOFF, PART_SUFFIX,
    READ_TIMEOUT_SECS,
};
pub use engine::{
    DEFAULT_CONCURRENCY, DownloadEngine, DownloadStats, DownloadTask, EngineError, JobReport,
    JobSummary, MAX_CONCURRENCY, MIN_CONCURRENCY, TaskStatus,
};
pub use error::DownloadError;
pub use progress::{NoopProgress, ProgressObserver, TaskProgress, human_readable_size};
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, MAX_RETRIES_LIMIT, RetryDecision, RetryPolicy,
    classify_error,
};
