use crate::render::OutboundMessage;
use crate::traits::MessageSink;
use crate::types::{RelayError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Discord-compatible webhook client
pub struct DiscordWebhook {
    client: Client,
    url: Url,
}

impl DiscordWebhook {
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, webhook_url)
    }

    pub fn with_client(client: Client, webhook_url: &str) -> Result<Self> {
        let mut url = Url::parse(webhook_url)?;
        // Ask for a synchronous response so a rejected message surfaces as an error
        url.query_pairs_mut().append_pair("wait", "true");
        Ok(Self { client, url })
    }

    /// Target URL with the token path segment masked, for logging.
    pub fn redacted_url(&self) -> String {
        let mut segments: Vec<&str> = self.url.path_segments().map(|s| s.collect()).unwrap_or_default();
        if let Some(last) = segments.last_mut() {
            *last = "***";
        }
        format!(
            "{}://{}/{}",
            self.url.scheme(),
            self.url.host_str().unwrap_or(""),
            segments.join("/")
        )
    }
}

#[async_trait]
impl MessageSink for DiscordWebhook {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        let payload = message.to_payload();
        debug!("Sending {:?} message to {}", message.mode(), self.redacted_url());

        let resp = self.client.post(self.url.clone()).json(&payload).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::Delivery {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
