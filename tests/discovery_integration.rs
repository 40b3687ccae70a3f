//! Integration tests for listing-page discovery against a mock host.

use iadl_core::{Category, DiscoveryError, LinkDiscovery, resolve_filter};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::{mount_listing, start_mock_server_or_skip};

const LISTING: &str = r#"<!DOCTYPE html>
<html><body>
  <a href="/details/concert">Back to item</a>
  <a href="/download/concert/track01.mp3">track01.mp3</a>
  <a href="/download/concert/cover.jpg">cover.jpg</a>
  <a href="/download/concert/track02.flac">track02.flac</a>
  <a href="/download/concert/concert_meta.xml">concert_meta.xml</a>
  <a href="/download/concert/track03.ogg">track03.ogg</a>
</body></html>"#;

#[tokio::test]
async fn test_discover_returns_matching_links_in_document_order() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_listing(&server, "concert", LISTING).await;

    let discovery = LinkDiscovery::new(&server.uri()).unwrap();
    let filter = resolve_filter(&[Category::Audio]);
    let links = discovery.discover("concert", &filter, false).await.unwrap();

    let names: Vec<&str> = links.iter().map(|link| link.file_name()).collect();
    assert_eq!(names, vec!["track01.mp3", "track02.flac", "track03.ogg"]);
    assert_eq!(
        links[0].as_str(),
        format!("{}/download/concert/track01.mp3", server.uri())
    );
}

#[tokio::test]
async fn test_discover_without_filter_keeps_every_known_type() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_listing(&server, "concert", LISTING).await;

    let discovery = LinkDiscovery::new(&server.uri()).unwrap();
    let links = discovery
        .discover("concert", &resolve_filter(&[]), false)
        .await
        .unwrap();

    // The details anchor lacks the download path and is never kept.
    assert_eq!(links.len(), 5);
}

#[tokio::test]
async fn test_discover_empty_when_nothing_matches() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_listing(&server, "concert", LISTING).await;

    let discovery = LinkDiscovery::new(&server.uri()).unwrap();
    let links = discovery
        .discover("concert", &resolve_filter(&[Category::Torrent]), false)
        .await
        .unwrap();
    assert!(links.is_empty());
}

#[tokio::test]
async fn test_discover_reports_http_status_as_fetch_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/details/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let discovery = LinkDiscovery::new(&server.uri()).unwrap();
    let err = discovery
        .discover("missing", &resolve_filter(&[]), false)
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::HttpStatus { status: 404, .. }));
    assert!(err.is_fetch_error());
}

#[tokio::test]
async fn test_discover_rejects_non_html_body() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/details/binary"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfe, 0x00, 0x81]))
        .mount(&server)
        .await;

    let discovery = LinkDiscovery::new(&server.uri()).unwrap();
    let err = discovery
        .discover("binary", &resolve_filter(&[]), false)
        .await
        .unwrap_err();
    assert!(err.is_parse_error(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_discover_reports_unreachable_host() {
    if support::socket_guard::should_skip_socket_bound_test() {
        return;
    }
    // Bind then drop a listener so the port is very likely closed.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let discovery = LinkDiscovery::new(&format!("http://127.0.0.1:{port}")).unwrap();
    let err = discovery
        .discover("anything", &resolve_filter(&[]), false)
        .await
        .unwrap_err();
    assert!(err.is_fetch_error(), "unexpected error: {err}");
}
