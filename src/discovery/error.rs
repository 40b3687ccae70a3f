//! Error types for listing-page discovery.

use thiserror::Error;

/// Errors that can occur while fetching or reading an item listing page.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching listing {url}: {source}")]
    Network {
        /// The listing URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Listing request timed out.
    #[error("timeout fetching listing {url}")]
    Timeout {
        /// The listing URL that timed out.
        url: String,
    },

    /// The listing page returned a non-success status.
    #[error("HTTP {status} fetching listing {url}")]
    HttpStatus {
        /// The listing URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The listing page body could not be read as an HTML document.
    #[error("could not parse listing {url}: {reason}")]
    Parse {
        /// The listing URL.
        url: String,
        /// What was wrong with the document.
        reason: String,
    },

    /// The configured base host URL is malformed.
    #[error("invalid base URL: {url}")]
    InvalidBaseUrl {
        /// The rejected base URL.
        url: String,
    },

    /// The item identifier was empty.
    #[error("item identifier is empty")]
    EmptyItemId,

    /// The HTTP client could not be constructed.
    #[error("failed to build listing HTTP client: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DiscoveryError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a parse error.
    pub fn parse(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid base URL error.
    pub fn invalid_base_url(url: impl Into<String>) -> Self {
        Self::InvalidBaseUrl { url: url.into() }
    }

    /// Returns true if the listing page could not be retrieved.
    #[must_use]
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::HttpStatus { .. }
        )
    }

    /// Returns true if the listing page was retrieved but is not a usable document.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
