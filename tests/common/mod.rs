//! Shared fixtures: host pages and an in-process generation endpoint

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Compose window with subject, body, toolbar and reply box
pub const COMPOSE_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
  <div class="nH">
    <h2 class="h7">Quarterly numbers</h2>
    <div class="a3s aiL">Could you send the final figures by Friday?</div>
  </div>
  <div role="dialog">
    <table><tr><td class="btC"><div class="dC"><div class="T-I aoO">Send</div></div></td></tr></table>
    <div role="textbox" g_editable="true" contenteditable="true">Hello Bob,</div>
  </div>
</body></html>"#;

/// Inbox view with nothing to reply to and no compose window
pub const INBOX_PAGE: &str = r#"<!DOCTYPE html>
<html><body><div class="inbox"><span>No new mail</span></div></body></html>"#;

/// Compose markup the host inserts when the user clicks Reply
pub const COMPOSE_WINDOW: &str = r#"<div role="dialog"><div class="aDh"><div class="T-I aoO">Send</div></div><div role="textbox" g_editable="true"></div></div>"#;

/// A request the canned endpoint received
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub body: serde_json::Value,
}

/// Loopback HTTP endpoint answering every request with the same response
pub struct CannedEndpoint {
    pub url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl CannedEndpoint {
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub async fn spawn_endpoint(status: u16, body: &'static str) -> CannedEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let seen = seen.clone();
            tokio::spawn(async move {
                if let Some(request) = read_request(&mut stream).await {
                    seen.lock().unwrap().push(request);
                }
                let reason = if status < 400 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    CannedEndpoint {
        url: format!("http://{}/api/email/generate", addr),
        requests,
    }
}

/// URL of a loopback port nobody is listening on
pub async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/email/generate", addr)
}

async fn read_request(stream: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = (body_start + content_length).min(buf.len());
    let body = serde_json::from_slice(&buf[body_start..body_end]).unwrap_or(serde_json::Value::Null);

    Some(CapturedRequest { method, path, body })
}
