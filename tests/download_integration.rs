//! Integration tests for the streaming HTTP fetcher.

use iadl_core::download::{FetchOutcome, FileFetcher, TaskProgress, part_path_for};
use iadl_core::{DownloadError, FileLink, HttpClient, NoopProgress};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn link_for(server: &MockServer, file_path: &str) -> FileLink {
    FileLink::parse(&format!("{}{file_path}", server.uri())).unwrap()
}

async fn fetch(
    link: &FileLink,
    destination: &std::path::Path,
    cancel: &CancellationToken,
) -> Result<FetchOutcome, DownloadError> {
    let client = HttpClient::new().unwrap();
    let progress = TaskProgress::new(&NoopProgress, 0, link.file_name(), 1);
    client.fetch(link, destination, cancel, &progress).await
}

#[tokio::test]
async fn test_fetch_writes_file_and_removes_part() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let body = b"ID3 fake mp3 payload".to_vec();
    Mock::given(method("GET"))
        .and(path("/download/item/song.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let link = link_for(&server, "/download/item/song.mp3");
    let destination = dir.path().join(link.file_name());

    let outcome = fetch(&link, &destination, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Completed {
            bytes: body.len() as u64
        }
    );
    assert_eq!(std::fs::read(&destination).unwrap(), body);
    assert!(!part_path_for(&destination).exists());
}

#[tokio::test]
async fn test_fetch_decodes_file_name_from_url() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/download/item/My%20Song.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let link = link_for(&server, "/download/item/My%20Song.mp3");
    assert_eq!(link.file_name(), "My Song.mp3");
    let destination = dir.path().join(link.file_name());

    fetch(&link, &destination, &CancellationToken::new())
        .await
        .unwrap();
    assert!(dir.path().join("My Song.mp3").is_file());
}

#[tokio::test]
async fn test_fetch_non_success_status_is_http_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/download/item/gone.mp3"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let link = link_for(&server, "/download/item/gone.mp3");
    let destination = dir.path().join(link.file_name());

    let err = fetch(&link, &destination, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::HttpStatus { status: 503, .. }));
    assert!(!destination.exists());
    assert!(!part_path_for(&destination).exists());
}

/// Serves one response that declares 100 bytes but sends 10, then closes.
async fn spawn_truncating_server() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nonly ten!!")
                .await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_fetch_truncated_body_fails_and_cleans_up() {
    if support::socket_guard::should_skip_socket_bound_test() {
        return;
    }
    let base = spawn_truncating_server().await;

    let dir = TempDir::new().unwrap();
    let link = FileLink::parse(&format!("{base}/download/item/short.bin")).unwrap();
    let destination = dir.path().join(link.file_name());

    let err = fetch(&link, &destination, &CancellationToken::new())
        .await
        .unwrap_err();
    // The client reports either the early EOF or the size mismatch.
    assert!(
        matches!(
            err,
            DownloadError::Integrity { .. } | DownloadError::Network { .. }
        ),
        "unexpected error: {err}"
    );
    assert!(!destination.exists());
    assert!(!part_path_for(&destination).exists());
}

#[tokio::test]
async fn test_fetch_cancelled_before_body_keeps_part_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/download/item/big.iso"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let link = link_for(&server, "/download/item/big.iso");
    let destination = dir.path().join(link.file_name());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = fetch(&link, &destination, &cancel).await.unwrap();

    assert!(matches!(outcome, FetchOutcome::Cancelled { .. }));
    assert!(!destination.exists());
    assert!(part_path_for(&destination).exists());
}

/// Serves 100 bytes as ten 10-byte chunks spaced `gap` apart.
async fn spawn_trickling_server(gap: std::time::Duration) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n")
                .await;
            for _ in 0..10 {
                tokio::time::sleep(gap).await;
                if socket.write_all(&[7u8; 10]).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
            }
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_slow_steady_transfer_outlives_read_timeout() {
    if support::socket_guard::should_skip_socket_bound_test() {
        return;
    }
    // Whole transfer takes about 3s; no single gap comes near the 1s limit.
    let base = spawn_trickling_server(std::time::Duration::from_millis(300)).await;

    let dir = TempDir::new().unwrap();
    let link = FileLink::parse(&format!("{base}/download/item/big.iso")).unwrap();
    let destination = dir.path().join(link.file_name());

    let client = HttpClient::with_timeouts(5, 1).unwrap();
    let progress = TaskProgress::new(&NoopProgress, 0, link.file_name(), 1);
    let outcome = client
        .fetch(&link, &destination, &CancellationToken::new(), &progress)
        .await
        .unwrap();

    assert_eq!(outcome, FetchOutcome::Completed { bytes: 100 });
    assert_eq!(std::fs::read(&destination).unwrap(), vec![7u8; 100]);
}

#[tokio::test]
async fn test_stalled_transfer_times_out() {
    if support::socket_guard::should_skip_socket_bound_test() {
        return;
    }
    let base = spawn_trickling_server(std::time::Duration::from_secs(3)).await;

    let dir = TempDir::new().unwrap();
    let link = FileLink::parse(&format!("{base}/download/item/stuck.iso")).unwrap();
    let destination = dir.path().join(link.file_name());

    let client = HttpClient::with_timeouts(5, 1).unwrap();
    let progress = TaskProgress::new(&NoopProgress, 0, link.file_name(), 1);
    let err = client
        .fetch(&link, &destination, &CancellationToken::new(), &progress)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Timeout { .. }), "unexpected error: {err}");
    assert!(!part_path_for(&destination).exists());
}
