use crate::types::{FetchConfig, FetchResult, RelayError, Result};
use reqwest::{redirect::Policy, Client};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            Policy::limited(config.max_redirects)
        } else {
            Policy::none()
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect)
            .build()?;

        Ok(Self { client, config })
    }

    /// Single attempt; a timeout or non-2xx response is returned as an error
    /// and the caller decides whether to skip the feed.
    pub async fn fetch_feed(&self, url: &str) -> Result<FetchResult> {
        let start_time = Instant::now();

        debug!("Requesting feed: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(RelayError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        if let Some(content_length) = response.content_length() {
            let size_mb = content_length as usize / (1024 * 1024);
            if size_mb > self.config.max_feed_size_mb {
                return Err(RelayError::FeedTooLarge { size_mb });
            }
        }

        let content = response.text().await?;
        let size_mb = content.len() / (1024 * 1024);
        if size_mb > self.config.max_feed_size_mb {
            return Err(RelayError::FeedTooLarge { size_mb });
        }

        let response_time_ms = start_time.elapsed().as_millis() as u64;
        info!("Fetched feed: {} ({} bytes in {} ms)", url, content.len(), response_time_ms);

        Ok(FetchResult {
            url: url.to_string(),
            response_time_ms,
            http_status: status.as_u16(),
            content,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}
