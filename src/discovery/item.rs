//! Item identifier derivation from item URLs.

use url::Url;

/// Path segment that precedes the identifier in item-details URLs.
pub const DETAILS_MARKER: &str = "details";

/// Derives the item identifier from a full item URL or a bare identifier.
///
/// For `https://archive.org/details/<id>/...` the identifier is the segment
/// right after `details`. Any other input yields its whole path with leading
/// and trailing slashes stripped. Returns `None` when nothing remains.
///
/// ```
/// use iadl_core::discovery::item_id_from_url;
///
/// assert_eq!(
///     item_id_from_url("https://archive.org/details/rr-sega-mega-cd").as_deref(),
///     Some("rr-sega-mega-cd")
/// );
/// assert_eq!(item_id_from_url("some-item").as_deref(), Some("some-item"));
/// ```
#[must_use]
pub fn item_id_from_url(input: &str) -> Option<String> {
    let input = input.trim();
    let raw_path = match Url::parse(input) {
        Ok(url) if url.has_host() => url.path().to_string(),
        _ => input.to_string(),
    };
    let path = raw_path.trim_matches('/');

    let item_id = match path.split_once('/') {
        Some((marker, rest)) if marker == DETAILS_MARKER => {
            rest.split('/').next().unwrap_or_default()
        }
        _ => path,
    };

    (!item_id.is_empty()).then(|| item_id.to_string())
}
