use crate::config::RelayConfig;
use crate::novelty::{MarkSeen, NoveltyFilter};
use crate::rate_limit::RateLimiter;
use crate::render::MessageRenderer;
use crate::rss_utils::time::{cutoff, format_duration};
use crate::scheduler::DeliveryScheduler;
use crate::state::{State, StateStore};
use crate::traits::{FeedSource, MessageSink};
use crate::types::{NovelItem, Result, RunSummary};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// One polling pass: load state, fetch and filter every feed, deliver, save.
pub struct RssRelay {
    config: RelayConfig,
    source: Arc<dyn FeedSource>,
    sink: Arc<dyn MessageSink>,
    store: StateStore,
}

impl RssRelay {
    pub fn new(config: RelayConfig, source: Arc<dyn FeedSource>, sink: Arc<dyn MessageSink>) -> Self {
        let store = StateStore::new(config.state_file_path.clone())
            .with_max_seen_per_feed(config.max_seen_per_feed);

        Self {
            config,
            source,
            sink,
            store,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<RunSummary> {
        self.run_at(Utc::now()).await
    }

    /// Run with the recency window measured back from `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id);
        self.execute(run_id, now).instrument(span).await
    }

    async fn execute(&self, run_id: String, now: DateTime<Utc>) -> Result<RunSummary> {
        let mut state = self.store.load().await;

        if self.config.prune_unconfigured_feeds {
            for removed in state.retain_feeds(&self.config.feeds) {
                info!("Dropping state for unconfigured feed {}", removed);
            }
        }

        let filter = NoveltyFilter::new(cutoff(now, self.config.recency_window), self.config.mark_seen);
        info!(
            "Looking back {} (cutoff {})",
            format_duration(self.config.recency_window),
            filter.cutoff().to_rfc3339()
        );

        let mut summary = RunSummary {
            run_id,
            ..RunSummary::default()
        };
        let all_new = self.collect_novel_items(&filter, &mut state, &mut summary).await;
        summary.queued = all_new.len();

        info!("Total new items to post: {}", all_new.len());
        info!("Sorting and posting…");

        let mut scheduler = DeliveryScheduler::new(
            self.sink.clone(),
            MessageRenderer::new(self.config.rich_hosts.clone()),
            RateLimiter::new(self.config.send_delay),
        );
        let report = scheduler.deliver(all_new).await;
        summary.delivered = report.delivered.len();

        match filter.policy() {
            MarkSeen::OnDelivery => {
                for novel in &report.delivered {
                    state.seen_mut(&novel.feed_id).insert(novel.identifier.clone());
                }
            }
            MarkSeen::OnDiscovery if !report.abandoned.is_empty() => {
                warn!(
                    "{} items were marked seen but not delivered and will not be retried",
                    report.abandoned.len()
                );
            }
            MarkSeen::OnDiscovery => {}
        }

        // Saved whether or not delivery completed
        let saved = self.store.save(&state).await;
        info!("Finished processing all feeds.");

        match (report.error, saved) {
            (delivery_error, Err(save_error)) => {
                if let Some(e) = delivery_error {
                    error!("Delivery also failed during this run: {}", e);
                }
                error!("Failed to save state: {}", save_error);
                Err(save_error)
            }
            (Some(delivery_error), Ok(())) => Err(delivery_error),
            (None, Ok(())) => {
                info!(
                    "Run complete: {}/{} feeds fetched, {} delivered",
                    summary.feeds_total - summary.feeds_failed,
                    summary.feeds_total,
                    summary.delivered
                );
                Ok(summary)
            }
        }
    }

    /// Fetch each configured feed in order; a failing feed is skipped and its
    /// seen set left untouched.
    async fn collect_novel_items(
        &self,
        filter: &NoveltyFilter,
        state: &mut State,
        summary: &mut RunSummary,
    ) -> Vec<NovelItem> {
        let mut all_new = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();

        for url in &self.config.feeds {
            if !visited.insert(url.as_str()) {
                warn!("Feed {} is configured more than once, skipping repeat", url);
                continue;
            }
            summary.feeds_total += 1;

            info!("Fetching: {}", url);
            let items = match self.source.fetch_feed(url).await {
                Ok(items) => items,
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    summary.feeds_failed += 1;
                    continue;
                }
            };

            let outcome = filter.filter_feed(url, items, state.seen_mut(url));
            all_new.extend(outcome.novel);
        }

        all_new
    }
}
