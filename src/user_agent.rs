//! Shared User-Agent string for listing and file requests.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/iadl";

/// Default User-Agent identifying the tool and its version.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("iadl/{version} (archive-downloader; +{PROJECT_UA_URL})")
}
