//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use folio_edge::config::EdgeConfig;
use folio_edge::{EdgeServer, Shutdown};

/// A canned upstream reply.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Send `Content-Length`; otherwise the body is delimited by closing the connection.
    pub declare_length: bool,
}

impl MockResponse {
    pub fn image(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
            declare_length: true,
        }
    }

    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
            declare_length: true,
        }
    }

    pub fn undeclared(mut self) -> Self {
        self.declare_length = false;
        self
    }
}

/// Eight-byte PNG signature followed by `len - 8` filler bytes.
pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    bytes.extend((0..len.saturating_sub(8)).map(|i| (i % 251) as u8));
    bytes
}

/// Requests seen by a mock upstream, head and body as text.
pub type Recorded = Arc<Mutex<Vec<String>>>;

/// Start a raw TCP upstream that answers every request with `response`.
pub async fn start_mock_upstream(response: MockResponse) -> SocketAddr {
    start_scripted_upstream(vec![response]).await.0
}

/// Start a raw TCP upstream that answers the n-th request with the n-th
/// response (the last one repeats) and records every request it reads.
pub async fn start_scripted_upstream(responses: Vec<MockResponse>) -> (SocketAddr, Recorded) {
    assert!(!responses.is_empty());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let responses = Arc::new(responses);
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let served = Arc::new(AtomicUsize::new(0));

    let log = recorded.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let responses = responses.clone();
                    let log = log.clone();
                    let served = served.clone();
                    tokio::spawn(async move {
                        let request = read_request(&mut socket).await;
                        log.lock().unwrap().push(request);

                        let n = served.fetch_add(1, Ordering::SeqCst);
                        let response = &responses[n.min(responses.len() - 1)];

                        let mut head = format!(
                            "HTTP/1.1 {} Mock\r\nContent-Type: {}\r\nConnection: close\r\n",
                            response.status, response.content_type
                        );
                        if response.declare_length {
                            head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
                        }
                        head.push_str("\r\n");

                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(&response.body).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, recorded)
}

/// Read the request head and, when `Content-Length` is present, its body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + body_len {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Config pointing at `root` with no content credentials.
pub fn test_config(root: &Path) -> EdgeConfig {
    let mut config = EdgeConfig::default();
    config.statics.root = root.to_string_lossy().into_owned();
    config.cors.allowed_origins = vec!["https://site.example".to_string()];
    config
}

/// Write a small frontend into `root`.
pub fn write_site(root: &Path) {
    std::fs::write(root.join("index.html"), "<!doctype html><title>folio</title>").unwrap();
    std::fs::create_dir_all(root.join("assets")).unwrap();
    std::fs::write(root.join("assets/app.js"), "console.log('folio');").unwrap();
    std::fs::write(root.join("notes.txt"), "not served").unwrap();
}

/// Run an edge server on an ephemeral port.
pub async fn start_edge(config: EdgeConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = EdgeServer::new(config).unwrap();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
