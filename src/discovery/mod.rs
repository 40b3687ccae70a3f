//! Link discovery for item listing pages.
//!
//! Fetches an item's listing page once, keeps anchors whose target contains
//! the remote service's download marker (`/download/`), resolves them against
//! the base host, and retains those admitted by an [`ExtensionFilter`].
//!
//! Discovery never retries. A failed fetch or an unreadable document is
//! returned as a [`DiscoveryError`]; no partial link list is produced.
//!
//! # Example
//!
//! ```no_run
//! use iadl_core::discovery::LinkDiscovery;
//! use iadl_core::extensions::{Category, resolve_filter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let discovery = LinkDiscovery::new("https://archive.org")?;
//! let filter = resolve_filter(&[Category::Video]);
//! let links = discovery.discover("some-item", &filter, false).await?;
//! for link in &links {
//!     println!("{} -> {}", link, link.file_name());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod html;
mod item;
mod link;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use error::DiscoveryError;
pub use item::{DETAILS_MARKER, item_id_from_url};
pub use link::{FileLink, LinkError};

use crate::extensions::ExtensionFilter;
use crate::user_agent;

/// Default remote host.
pub const DEFAULT_BASE_URL: &str = "https://archive.org";

/// Path fragment that marks download endpoints on the remote host.
pub const DOWNLOAD_PATH_MARKER: &str = "/download/";

/// Listing client connect timeout (10 seconds).
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Listing client read timeout (30 seconds).
const READ_TIMEOUT_SECS: u64 = 30;

/// Fetches listing pages and extracts filtered file links.
#[derive(Debug, Clone)]
pub struct LinkDiscovery {
    client: Client,
    base_url: Url,
}

impl LinkDiscovery {
    /// Creates a discovery client for `base_url` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::InvalidBaseUrl`] if `base_url` is not an
    /// absolute http(s) URL, or [`DiscoveryError::Client`] if the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str) -> Result<Self, DiscoveryError> {
        Self::with_timeouts(base_url, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a discovery client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Same as [`LinkDiscovery::new`].
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        base_url: &str,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, DiscoveryError> {
        let parsed = Url::parse(base_url.trim())
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .ok_or_else(|| DiscoveryError::invalid_base_url(base_url))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| DiscoveryError::Client { source })?;

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// Returns the base host URL links are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the listing page URL for `item_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::EmptyItemId`] for an empty identifier.
    pub fn listing_url(&self, item_id: &str) -> Result<Url, DiscoveryError> {
        let item_id = item_id.trim().trim_matches('/');
        if item_id.is_empty() {
            return Err(DiscoveryError::EmptyItemId);
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        let raw = format!("{base}/{DETAILS_MARKER}/{item_id}");
        Url::parse(&raw).map_err(|_| DiscoveryError::invalid_base_url(raw))
    }

    /// Fetches the listing page for `item_id` and returns matching file links.
    ///
    /// Links are returned in the order their anchors appear in the document.
    /// When `preview_only` is set, a numbered listing is also written to stdout.
    ///
    /// # Errors
    ///
    /// Returns a fetch-class [`DiscoveryError`] if the page cannot be
    /// retrieved or answers with a non-success status, and
    /// [`DiscoveryError::Parse`] if the body is not an HTML document.
    #[instrument(skip(self, filter), fields(base_url = %self.base_url))]
    pub async fn discover(
        &self,
        item_id: &str,
        filter: &ExtensionFilter,
        preview_only: bool,
    ) -> Result<Vec<FileLink>, DiscoveryError> {
        let listing_url = self.listing_url(item_id)?;
        info!(url = %listing_url, "visiting listing page");

        let document = self.fetch_document(&listing_url).await?;
        debug!(bytes = document.len(), "listing page fetched");

        let links = extract_file_links(&document, &self.base_url, filter);
        info!(matched = links.len(), "discovered file links");

        if preview_only && !links.is_empty() {
            print!("{}", format_link_listing(&links));
        }

        Ok(links)
    }

    async fn fetch_document(&self, listing_url: &Url) -> Result<String, DiscoveryError> {
        let url = listing_url.as_str();
        let response = self
            .client
            .get(listing_url.clone())
            .send()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::http_status(url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        let document = String::from_utf8(body.to_vec())
            .map_err(|_| DiscoveryError::parse(url, "listing page is not valid UTF-8"))?;
        if !html::looks_like_html(&document) {
            return Err(DiscoveryError::parse(
                url,
                "listing page contains no HTML markup",
            ));
        }
        Ok(document)
    }
}

fn classify_request_error(url: &str, error: reqwest::Error) -> DiscoveryError {
    if error.is_timeout() {
        DiscoveryError::timeout(url)
    } else {
        DiscoveryError::network(url, error)
    }
}

/// Extracts download links from a listing document.
///
/// An anchor is kept iff its raw href contains [`DOWNLOAD_PATH_MARKER`], ends
/// with a suffix admitted by `filter`, and resolves to a valid [`FileLink`].
/// Output order equals document order.
#[must_use]
pub fn extract_file_links(
    document: &str,
    base_url: &Url,
    filter: &ExtensionFilter,
) -> Vec<FileLink> {
    let hrefs = html::anchor_hrefs(document);
    let download_hrefs: Vec<&String> = hrefs
        .iter()
        .filter(|href| href.contains(DOWNLOAD_PATH_MARKER))
        .collect();
    debug!(
        anchors = hrefs.len(),
        download_anchors = download_hrefs.len(),
        "scanned listing anchors"
    );

    download_hrefs
        .into_iter()
        .filter(|href| filter.matches(href))
        .filter_map(|href| {
            let resolved = match base_url.join(href) {
                Ok(url) => url,
                Err(e) => {
                    warn!(href = %href, error = %e, "skipping unresolvable link");
                    return None;
                }
            };
            match FileLink::new(resolved) {
                Ok(link) => Some(link),
                Err(e) => {
                    warn!(href = %href, error = %e, "skipping unsafe link");
                    None
                }
            }
        })
        .collect()
}

/// Renders the human-readable numbered listing shown in preview mode.
#[must_use]
pub fn format_link_listing(links: &[FileLink]) -> String {
    let mut out = String::from("\n=== File Links ===\n");
    for (index, link) in links.iter().enumerate() {
        out.push_str(&format!("{:>3}. {}\n", index + 1, link));
    }
    out.push_str("==================\n\n");
    out
}
