// Allow dead code: not every test binary uses every helper
#![allow(dead_code)]

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Serve canned HTTP responses on a local port, one per request in order.
/// The last response repeats once the list is exhausted.
/// Returns the feed URL.
pub async fn spawn_feed(responses: &[(u16, &str)]) -> String {
    assert!(!responses.is_empty());
    let responses: Vec<(u16, String)> = responses
        .iter()
        .map(|(status, body)| (*status, body.to_string()))
        .collect();

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind feed listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(async move {
        let mut served = 0usize;
        while let Ok((socket, _)) = listener.accept().await {
            let (status, body) = responses[served.min(responses.len() - 1)].clone();
            served += 1;
            tokio::spawn(respond(socket, status, body));
        }
    });

    format!("http://{addr}/prices/main/data.json")
}

/// Accept connections but never answer them.
pub async fn spawn_silent_feed() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind feed listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _held = socket;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });

    format!("http://{addr}/data.json")
}

async fn respond(mut socket: TcpStream, status: u16, body: String) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                request.extend_from_slice(&buf[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }

    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}
