use crate::render::OutboundMessage;
use crate::types::{FeedItem, Result};
use async_trait::async_trait;

/// Trait for pulling items from a syndication source
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed at `url`, returning its items in source order
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedItem>>;
}

/// Trait for the downstream notification channel
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one rendered message. No retry is attempted on failure.
    async fn send(&self, message: &OutboundMessage) -> Result<()>;
}
