#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rss_relay::{FeedItem, FeedSource, MessageSink, OutboundMessage, RelayError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Fixed "current time" used by every run in the tests.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - Duration::hours(hours)
}

pub fn item(link: &str, published_at: DateTime<Utc>) -> FeedItem {
    FeedItem {
        identifier: Some(link.to_string()),
        title: Some(format!("Title of {}", link)),
        published_at: Some(published_at),
        link: Some(link.to_string()),
        snippet: Some("Snippet".to_string()),
        enclosure: None,
    }
}

/// Feed source answering from a fixed table; unknown URLs fail.
#[derive(Default)]
pub struct StaticFeeds {
    feeds: HashMap<String, Vec<FeedItem>>,
    pub calls: Mutex<Vec<String>>,
}

impl StaticFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, items: Vec<FeedItem>) -> Self {
        self.feeds.insert(url.to_string(), items);
        self
    }
}

#[async_trait]
impl FeedSource for StaticFeeds {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedItem>> {
        self.calls.lock().unwrap().push(url.to_string());
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| RelayError::General(format!("connection refused: {}", url)))
    }
}

/// Sink that records every message; optionally fails starting at a given call index.
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<OutboundMessage>>,
    fail_from: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_from(index: usize) -> Self {
        Self {
            fail_from: Some(index),
            ..Self::default()
        }
    }

    pub fn links(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|message| match message {
                OutboundMessage::Plain(link) => link.clone(),
                OutboundMessage::Rich(embed) => embed.url.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        let mut sent = self.sent.lock().unwrap();
        if let Some(index) = self.fail_from {
            if sent.len() >= index {
                return Err(RelayError::Delivery {
                    status: 500,
                    body: "upstream unavailable".to_string(),
                });
            }
        }
        sent.push(message.clone());
        Ok(())
    }
}

/// A captured HTTP request: request line and body.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub body: String,
}

/// Serve the canned `(status, content_type, body)` responses in order, one per
/// connection, on a loopback port. Returns the base URL and captured requests.
pub async fn serve_responses(
    responses: Vec<(u16, &'static str, String)>,
) -> (String, Arc<Mutex<Vec<CapturedRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();

    tokio::spawn(async move {
        for (status, content_type, body) in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let request = read_request(&mut socket).await;
            sink.lock().unwrap().push(request);

            let response = format!(
                "HTTP/1.1 {} Status\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                content_type,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), captured)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = buf.len().min(header_end + content_length);
    CapturedRequest {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[header_end..body_end]).to_string(),
    }
}
