#![allow(dead_code)]

use std::time::Duration;

use httpmock::MockServer;
use openai_kit::{ClientOptions, OpenAiClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const API_KEY: &str = "test-key";

/// Options pointing at the mock server, with a backoff short enough for tests.
pub fn options(server: &MockServer) -> ClientOptions {
    ClientOptions::new(API_KEY)
        .with_base_url(server.url("/v1"))
        .with_backoff_base(Duration::from_millis(1))
}

pub fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(options(server)).unwrap()
}

/// An SSE body from `data:` payloads, terminated by `[DONE]`.
pub fn sse_body(payloads: &[&str]) -> String {
    let mut body = String::new();
    for payload in payloads {
        body.push_str("data: ");
        body.push_str(payload);
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// Serve one chunked event stream on a local port, waiting `gap` before each payload.
///
/// Returns the base URL. The server stops writing once the client hangs up.
pub async fn serve_slow_sse(payloads: Vec<String>, gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\n\
                  transfer-encoding: chunked\r\n\r\n",
            )
            .await
            .unwrap();

        for payload in payloads {
            tokio::time::sleep(gap).await;
            if write_chunk(&mut socket, &format!("data: {payload}\n\n")).await.is_err() {
                return;
            }
        }
        if write_chunk(&mut socket, "data: [DONE]\n\n").await.is_ok() {
            let _ = socket.write_all(b"0\r\n\r\n").await;
        }
    });

    format!("http://{addr}/v1")
}

/// Answer every connection with the same raw bytes, then hang up.
pub async fn serve_raw(response: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            read_request(&mut socket).await;
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}/v1")
}

async fn write_chunk(socket: &mut TcpStream, data: &str) -> std::io::Result<()> {
    let framed = format!("{:x}\r\n{data}\r\n", data.len());
    socket.write_all(framed.as_bytes()).await?;
    socket.flush().await
}

/// Read one request: headers, then as much body as `content-length` announces.
async fn read_request(socket: &mut TcpStream) {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        request.extend_from_slice(&buf[..n]);

        let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if request.len() >= end + 4 + body_len {
            return;
        }
    }
}
