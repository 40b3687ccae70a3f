//! Validated absolute links to downloadable files.

use std::fmt;
use std::path::{Component, Path};

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Reasons a URL cannot be used as a [`FileLink`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The string is not an absolute URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
    },

    /// The URL scheme is not http or https.
    #[error("unsupported scheme '{scheme}' in {url}")]
    UnsupportedScheme {
        /// The rejected URL.
        url: String,
        /// The scheme found.
        scheme: String,
    },

    /// The last path segment does not decode to a usable file name.
    #[error("unsafe file name {file_name:?} derived from {url}")]
    UnsafeFileName {
        /// The rejected URL.
        url: String,
        /// The decoded (possibly empty) file name.
        file_name: String,
    },
}

/// Absolute URL of a downloadable resource plus its derived local file name.
///
/// The file name is the URL-decoded last path segment. Construction fails if
/// that name is empty or could escape the destination directory, so every
/// `FileLink` can be joined onto a directory safely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    url: Url,
    file_name: String,
}

impl FileLink {
    /// Builds a link from an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] for non-http(s) URLs and for file names that are
    /// empty, `.`/`..`, or contain path separators or control characters.
    pub fn new(url: Url) -> Result<Self, LinkError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LinkError::UnsupportedScheme {
                url: url.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        let file_name = file_name_from_url(&url);
        if !is_safe_file_name(&file_name) {
            return Err(LinkError::UnsafeFileName {
                url: url.to_string(),
                file_name,
            });
        }

        Ok(Self { url, file_name })
    }

    /// Parses and validates an absolute URL string.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidUrl`] if the string is not an absolute URL,
    /// otherwise the same errors as [`FileLink::new`].
    pub fn parse(raw: &str) -> Result<Self, LinkError> {
        let url = Url::parse(raw).map_err(|_| LinkError::InvalidUrl {
            url: raw.to_string(),
        })?;
        Self::new(url)
    }

    /// Returns the absolute URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Returns the decoded file name used for the local copy.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl fmt::Display for FileLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl Serialize for FileLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.url.as_str())
    }
}

/// URL-decoded last path segment, or an empty string when there is none.
fn file_name_from_url(url: &Url) -> String {
    let Some(last) = url.path_segments().and_then(|mut segments| segments.next_back()) else {
        return String::new();
    };

    match urlencoding::decode(last) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            debug!(
                segment = %last,
                error = %e,
                "URL decoding failed, using raw segment"
            );
            last.to_string()
        }
    }
}

fn is_safe_file_name(name: &str) -> bool {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.chars().any(char::is_control)
    {
        return false;
    }

    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
