//! iadl core library
//!
//! Finds downloadable files on an Internet Archive item's listing page and
//! retrieves a filtered subset of them under a bounded concurrency budget.
//!
//! # Architecture
//!
//! - [`extensions`] - Named file-suffix categories and filter resolution
//! - [`discovery`] - Listing page fetch, anchor extraction, [`FileLink`]
//! - [`download`] - Streaming fetcher and the retrying worker-pool engine

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod discovery;
pub mod download;
pub mod extensions;
mod user_agent;

// Re-export commonly used types
pub use discovery::{
    DEFAULT_BASE_URL, DiscoveryError, FileLink, LinkDiscovery, LinkError, item_id_from_url,
};
pub use download::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, DownloadEngine, DownloadError, DownloadStats,
    DownloadTask, EngineError, FileFetcher, HttpClient, JobReport, JobSummary, NoopProgress,
    ProgressObserver, RetryPolicy, TaskStatus, human_readable_size,
};
pub use extensions::{Category, ExtensionFilter, resolve_filter};
