//! Test utilities for completion client tests.
//!
//! A one-shot HTTP server on localhost stands in for the completion service.

use scriptorium_core::{GenerateRequest, Message};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Helper to create a single-message request.
pub fn create_test_request(prompt: &str) -> GenerateRequest {
    GenerateRequest::builder()
        .messages(vec![Message::user(prompt)])
        .max_tokens(Some(32))
        .build()
        .expect("Failed to build test request")
}

/// Serves exactly one request with a canned response.
///
/// Returns the base URL and a handle resolving to the raw request body.
pub async fn serve_once(
    status_line: &'static str,
    content_type: &'static str,
    body: String,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("Accept failed");
        let request_body = read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n{}",
            status_line, content_type, body
        );
        socket
            .write_all(response.as_bytes())
            .await
            .expect("Write failed");
        socket.shutdown().await.ok();
        request_body
    });

    (format!("http://{}/v1", addr), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut buf).await.expect("Read failed");
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = find(&raw, b"\r\n\r\n") {
            break pos + 4;
        }
        if n == 0 {
            return String::new();
        }
    };

    let headers = String::from_utf8_lossy(&raw[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while raw.len() < header_end + content_length {
        let n = socket.read(&mut buf).await.expect("Read failed");
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
    }

    String::from_utf8_lossy(&raw[header_end..]).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
