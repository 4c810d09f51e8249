use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source address of a configured feed. Used as the key of the persisted state.
pub type FeedId = String;

/// Canonical link of an item, unique within its feed.
pub type ItemId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enclosure {
    pub url: String,
    pub media_type: Option<String>,
}

/// One entry as produced by a feed source. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    /// `None` when the entry carries no link; such items are never tracked.
    pub identifier: Option<ItemId>,
    pub title: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub link: Option<String>,
    pub snippet: Option<String>,
    pub enclosure: Option<Enclosure>,
}

impl FeedItem {
    /// Publish time used for windowing and ordering. Entries without a
    /// parsable date sort as the unix epoch.
    pub fn effective_published(&self) -> DateTime<Utc> {
        // DateTime<Utc>::default() is 1970-01-01T00:00:00Z
        self.published_at.unwrap_or_default()
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

/// A feed item confirmed unseen and inside the recency window.
#[derive(Debug, Clone, PartialEq)]
pub struct NovelItem {
    pub feed_id: FeedId,
    pub identifier: ItemId,
    pub item: FeedItem,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "RSS-Relay/1.0".to_string(),
            timeout_seconds: 10,
            max_feed_size_mb: 10,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    pub response_time_ms: u64,
    pub http_status: u16,
    pub content: String,
}

/// Outcome of one successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: String,
    pub feeds_total: usize,
    pub feeds_failed: usize,
    pub queued: usize,
    pub delivered: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("Delivery rejected with HTTP {status}: {body}")]
    Delivery { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
