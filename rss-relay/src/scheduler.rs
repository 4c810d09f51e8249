use crate::rate_limit::RateLimiter;
use crate::render::MessageRenderer;
use crate::traits::MessageSink;
use crate::types::{NovelItem, RelayError};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

/// Result of one delivery pass.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Items whose send was confirmed, in send order.
    pub delivered: Vec<NovelItem>,
    /// Items not attempted because an earlier send failed.
    pub abandoned: Vec<NovelItem>,
    /// The send failure that stopped the pass, if any. The failing item is
    /// the first entry of `abandoned`.
    pub error: Option<RelayError>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Stable sort by publish time; equal timestamps keep their collection order.
pub fn order_chronologically(items: &mut [NovelItem]) {
    items.sort_by_key(|novel| novel.item.effective_published());
}

/// Sends novel items one at a time, oldest first, through a rate limiter.
pub struct DeliveryScheduler {
    sink: Arc<dyn MessageSink>,
    renderer: MessageRenderer,
    limiter: RateLimiter,
}

impl DeliveryScheduler {
    pub fn new(sink: Arc<dyn MessageSink>, renderer: MessageRenderer, limiter: RateLimiter) -> Self {
        Self {
            sink,
            renderer,
            limiter,
        }
    }

    /// Deliver `items` in chronological order. The first send failure stops
    /// the pass; nothing is retried.
    pub async fn deliver(&mut self, mut items: Vec<NovelItem>) -> DeliveryReport {
        order_chronologically(&mut items);

        let mut report = DeliveryReport::default();
        let mut queue = items.into_iter();

        while let Some(novel) = queue.next() {
            self.limiter.acquire().await;

            let published = novel
                .item
                .published_at
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| "undated".to_string());
            info!("Posting now: {} ({})", novel.item.display_title(), published);

            let message = self.renderer.render(&novel, Utc::now());
            let result = self.sink.send(&message).await;
            self.limiter.complete();

            match result {
                Ok(()) => report.delivered.push(novel),
                Err(e) => {
                    error!("Failed to post {}: {}", novel.identifier, e);
                    report.abandoned.push(novel);
                    report.abandoned.extend(queue);
                    report.error = Some(e);
                    break;
                }
            }
        }

        info!(
            "Delivered {} items, {} abandoned",
            report.delivered.len(),
            report.abandoned.len()
        );
        report
    }
}
