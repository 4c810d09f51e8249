use crate::novelty::MarkSeen;
use crate::rss_utils::url::is_valid_feed_url;
use crate::types::{FeedId, FetchConfig, RelayError, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_RECENCY_WINDOW_HOURS: u32 = 48;
pub const DEFAULT_SEND_DELAY_MS: u64 = 3000;
pub const DEFAULT_MAX_SEEN_PER_FEED: usize = 2000;

/// Command line and environment surface. Every option can come from the
/// environment (or a `.env` file) under the names the deployment already uses.
#[derive(Debug, Parser)]
#[command(name = "rss-relay", version, about = "Relay new feed items to a Discord webhook")]
pub struct Cli {
    /// Webhook URL messages are posted to
    #[arg(long, env = "DISCORD_NEWS_RSS_WEBHOOK", hide_env_values = true)]
    pub webhook_url: Option<String>,

    /// Feed URLs, separated by newlines and/or commas
    #[arg(long, env = "RSS_FEEDS", default_value = "")]
    pub feeds: String,

    /// Hostnames rendered as rich messages, one per line (substring match)
    #[arg(long, env = "EMBED_HOSTS", default_value = "")]
    pub embed_hosts: String,

    /// Seen-item state file
    #[arg(long, env = "JSON_FILE", default_value = "state.json")]
    pub state_file: PathBuf,

    #[arg(long, env = "RECENCY_WINDOW_HOURS", default_value_t = DEFAULT_RECENCY_WINDOW_HOURS)]
    pub recency_window_hours: u32,

    /// Pause between consecutive sends
    #[arg(long, env = "SEND_DELAY_MS", default_value_t = DEFAULT_SEND_DELAY_MS)]
    pub send_delay_ms: u64,

    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Seen identifiers kept per feed, oldest evicted first. 0 keeps everything.
    #[arg(long, env = "MAX_SEEN_PER_FEED", default_value_t = DEFAULT_MAX_SEEN_PER_FEED)]
    pub max_seen_per_feed: usize,

    /// Drop state for feeds that are no longer configured
    #[arg(long, env = "PRUNE_UNCONFIGURED_FEEDS")]
    pub prune_unconfigured_feeds: bool,

    /// When in-window items are recorded as seen. `on-delivery` records an item
    /// only after its post succeeds; `on-discovery` records every queued item
    /// before delivery, so items left unsent by an aborted run are never retried.
    #[arg(long, env = "MARK_SEEN", value_enum, default_value_t = MarkSeen::OnDelivery)]
    pub mark_seen: MarkSeen,
}

impl Cli {
    pub fn into_config(self) -> Result<RelayConfig> {
        let webhook_url = self
            .webhook_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| RelayError::Config("Missing DISCORD_NEWS_RSS_WEBHOOK".to_string()))?;

        let config = RelayConfig {
            feeds: split_feed_list(&self.feeds),
            recency_window: chrono::Duration::hours(i64::from(self.recency_window_hours)),
            send_delay: Duration::from_millis(self.send_delay_ms),
            rich_hosts: split_host_list(&self.embed_hosts),
            state_file_path: self.state_file,
            webhook_url: webhook_url.trim().to_string(),
            fetch: FetchConfig {
                timeout_seconds: self.fetch_timeout_secs,
                ..FetchConfig::default()
            },
            max_seen_per_feed: (self.max_seen_per_feed > 0).then_some(self.max_seen_per_feed),
            prune_unconfigured_feeds: self.prune_unconfigured_feeds,
            mark_seen: self.mark_seen,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub feeds: Vec<FeedId>,
    pub recency_window: chrono::Duration,
    pub send_delay: Duration,
    pub rich_hosts: Vec<String>,
    pub state_file_path: PathBuf,
    pub webhook_url: String,
    pub fetch: FetchConfig,
    pub max_seen_per_feed: Option<usize>,
    pub prune_unconfigured_feeds: bool,
    pub mark_seen: MarkSeen,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            recency_window: chrono::Duration::hours(i64::from(DEFAULT_RECENCY_WINDOW_HOURS)),
            send_delay: Duration::from_millis(DEFAULT_SEND_DELAY_MS),
            rich_hosts: Vec::new(),
            state_file_path: PathBuf::from("state.json"),
            webhook_url: String::new(),
            fetch: FetchConfig::default(),
            max_seen_per_feed: Some(DEFAULT_MAX_SEEN_PER_FEED),
            prune_unconfigured_feeds: false,
            mark_seen: MarkSeen::default(),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.webhook_url.is_empty() {
            return Err(RelayError::Config("Missing DISCORD_NEWS_RSS_WEBHOOK".to_string()));
        }
        if self.recency_window <= chrono::Duration::zero() {
            return Err(RelayError::Config("Recency window must be positive".to_string()));
        }
        if self.feeds.is_empty() {
            warn!("No feeds configured; nothing will be fetched");
        }
        for feed in &self.feeds {
            if !is_valid_feed_url(feed) {
                warn!("Feed {} is not an http(s) URL and will likely fail to fetch", feed);
            }
        }
        Ok(())
    }
}

/// Split on any run of newlines and commas, trimming and dropping blanks.
pub fn split_feed_list(raw: &str) -> Vec<FeedId> {
    raw.split(|c| c == '\n' || c == '\r' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// One host per line, trimmed, blanks dropped.
pub fn split_host_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
