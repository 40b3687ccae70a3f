//! HTTP file fetcher.
//!
//! [`HttpClient`] streams one file per call into `<name>.part` beside the
//! final path and renames it into place once the byte count agrees with the
//! declared content length. The [`FileFetcher`] trait is the seam the engine
//! drives, so tests can script outcomes without a network.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, PART_SUFFIX, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::progress::{TaskProgress, human_readable_size};
use crate::discovery::FileLink;
use crate::user_agent;

/// How a single fetch attempt ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The file is complete at its destination path.
    Completed {
        /// Bytes written.
        bytes: u64,
    },
    /// Cancellation was observed mid-transfer; partial data is left on disk.
    Cancelled {
        /// Bytes written before stopping.
        bytes: u64,
    },
}

/// Performs one transfer attempt of one file.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Fetches `link` into `destination`.
    ///
    /// Implementations check `cancel` between chunks and return
    /// [`FetchOutcome::Cancelled`] once it is set.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] describing why the attempt failed.
    async fn fetch(
        &self,
        link: &FileLink,
        destination: &Path,
        cancel: &CancellationToken,
        progress: &TaskProgress<'_>,
    ) -> Result<FetchOutcome, DownloadError>;
}

/// Returns the temporary path used while `destination` is being written.
#[must_use]
pub fn part_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Streaming HTTP client for file downloads.
///
/// Created once per run and shared by every worker so connections are pooled.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default timeouts (30s connect, 5min idle read).
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeout values.
    ///
    /// `read_timeout_secs` bounds the idle time between body reads, not the
    /// whole transfer, so a slow but steady download never times out.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self { client })
    }

    async fn send(&self, link: &FileLink) -> Result<reqwest::Response, DownloadError> {
        let url = link.as_str();
        let response = self
            .client
            .get(link.url().clone())
            .send()
            .await
            .map_err(|e| DownloadError::from_request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl FileFetcher for HttpClient {
    #[instrument(skip(self, cancel, progress), fields(url = %link, path = %destination.display()))]
    async fn fetch(
        &self,
        link: &FileLink,
        destination: &Path,
        cancel: &CancellationToken,
        progress: &TaskProgress<'_>,
    ) -> Result<FetchOutcome, DownloadError> {
        let response = self.send(link).await?;

        let declared = response.content_length();
        info!(
            file = link.file_name(),
            size = %declared.map_or_else(|| "unknown".to_string(), human_readable_size),
            "File size"
        );
        progress.start(declared);

        let part_path = part_path_for(destination);
        let mut file = File::create(&part_path)
            .await
            .map_err(|e| DownloadError::io(part_path.clone(), e))?;

        let streamed = stream_to_file(
            &mut file,
            response,
            link.as_str(),
            &part_path,
            cancel,
            progress,
        )
        .await;
        drop(file);

        let (bytes, cancelled) = match streamed {
            Ok(result) => result,
            Err(e) => {
                debug!(path = %part_path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        if cancelled {
            info!(bytes, path = %part_path.display(), "transfer cancelled, partial file kept");
            return Ok(FetchOutcome::Cancelled { bytes });
        }

        if let Some(expected) = declared.filter(|expected| *expected != bytes) {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(DownloadError::integrity(part_path, expected, bytes));
        }

        tokio::fs::rename(&part_path, destination)
            .await
            .map_err(|e| DownloadError::io(destination.to_path_buf(), e))?;

        info!(
            bytes,
            size = %human_readable_size(bytes),
            path = %destination.display(),
            "download complete"
        );
        Ok(FetchOutcome::Completed { bytes })
    }
}

/// Streams the response body to `file`, returning bytes written and whether
/// cancellation stopped the transfer early.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    cancel: &CancellationToken,
    progress: &TaskProgress<'_>,
) -> Result<(u64, bool), DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;
    let mut cancelled = false;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                cancelled = true;
                break;
            }
            next = stream.next() => next,
        };
        let Some(chunk_result) = next else {
            break;
        };
        let chunk = chunk_result.map_err(|e| DownloadError::from_request(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
        progress.advance(bytes_written);
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok((bytes_written, cancelled))
}
