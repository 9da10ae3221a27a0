//! In-memory stand-ins for the network seams.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Local;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{DeliveryError, FetchError};
use crate::fetch::PageSource;
use crate::model::{Listing, RawPage};
use crate::notify::Transport;

pub fn listing(id: &str) -> Listing {
    Listing {
        id: id.to_string(),
        kind: "Studio".to_string(),
        location: "Résidence Beauregard".to_string(),
        rent: "350€".to_string(),
        source_url: "https://example.org/search".to_string(),
        observed_at: Local::now(),
    }
}

/// Records every delivered message; recipients in `failing` are refused.
#[derive(Clone, Default)]
pub struct FakeTransport {
    failing: Arc<Mutex<HashSet<String>>>,
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeTransport {
    pub fn failing(recipients: &[&str]) -> Self {
        let transport = Self::default();
        transport.set_failing(recipients);
        transport
    }

    pub fn set_failing(&self, recipients: &[&str]) {
        *self.failing.lock().unwrap() = recipients.iter().map(|r| r.to_string()).collect();
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients_reached(&self) -> Vec<String> {
        self.sent().into_iter().map(|(r, _)| r).collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn deliver(&self, recipient: &str, html: &str) -> Result<(), DeliveryError> {
        let refused = self.failing.lock().unwrap().contains(recipient);
        if refused {
            return Err(DeliveryError::Api {
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), html.to_string()));
        Ok(())
    }
}

/// Serves whatever body was last set; `None` answers 503.
#[derive(Clone, Default)]
pub struct FakePageSource {
    body: Arc<Mutex<Option<String>>>,
    fetches: Arc<Mutex<usize>>,
}

impl FakePageSource {
    pub fn serving(body: &str) -> Self {
        let source = Self::default();
        source.set_body(Some(body));
        source
    }

    pub fn set_body(&self, body: Option<&str>) {
        *self.body.lock().unwrap() = body.map(str::to_string);
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl PageSource for FakePageSource {
    async fn fetch(&self, url: &str) -> Result<RawPage, FetchError> {
        *self.fetches.lock().unwrap() += 1;
        let body = self.body.lock().unwrap().clone();
        match body {
            Some(body) => Ok(RawPage {
                url: url.to_string(),
                body,
                fetched_at: Local::now(),
            }),
            None => Err(FetchError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                url: url.to_string(),
            }),
        }
    }
}

/// Answer exactly one HTTP request on a local port with a canned response.
/// Returns the base url, e.g. `http://127.0.0.1:41234`.
pub async fn serve_once(status_line: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });

    format!("http://{}", addr)
}

/// Drain headers and any `content-length` body so closing the socket does not reset it.
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + body_len {
            return;
        }
    }
}
