//! Helpers shared by unit tests.

use crate::data::loader::rows_from_text;
use crate::data::TradeStore;
use crate::models::TradeType;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Path to a file under `fixtures/`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

/// A store built from the bundled import and export fixtures.
pub fn fixture_store() -> TradeStore {
    let imports = std::fs::read_to_string(fixture_path("imports.csv")).unwrap();
    let exports = std::fs::read_to_string(fixture_path("exports.csv")).unwrap();

    let mut rows = rows_from_text(&imports, TradeType::Import).unwrap();
    rows.extend(rows_from_text(&exports, TradeType::Export).unwrap());
    TradeStore::from_rows(rows)
}

/// Serve a single canned HTTP response on an ephemeral port.
///
/// Returns the base URL and a handle resolving to the raw request text.
pub async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();

        request
    });

    (format!("http://{}", addr), handle)
}

/// A base URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}
