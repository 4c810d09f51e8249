use crate::traits::FeedSource;
use crate::types::{FeedItem, FetchConfig, RelayError, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use tracing::{debug, info};

/// Feed source backed by HTTP: one GET per call, parsed with `FeedParser`.
pub struct HttpFeedSource {
    fetcher: Fetcher,
    parser: FeedParser,
}

impl HttpFeedSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
            parser: FeedParser::new(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedItem>> {
        let fetch_result = self.fetcher.fetch_feed(url).await?;

        if !FeedParser::is_valid_feed_content(&fetch_result.content) {
            return Err(RelayError::Parse(format!(
                "Response from {} does not look like a feed (HTTP {})",
                url, fetch_result.http_status
            )));
        }

        let parsed = self.parser.parse_feed(&fetch_result.content)?;
        debug!(
            "Feed {} titled {:?} fetched in {} ms",
            fetch_result.url, parsed.title, fetch_result.response_time_ms
        );

        info!("Pulled {} items from {}", parsed.items.len(), url);
        Ok(parsed.items)
    }
}
