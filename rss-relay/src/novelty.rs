use crate::state::SeenSet;
use crate::types::{FeedItem, NovelItem};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

/// When a novel, in-window identifier is written to its feed's seen set.
///
/// Out-of-window identifiers are always recorded at discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MarkSeen {
    /// Recorded while filtering, before any send is attempted. A send abort
    /// loses the notification for every item still queued.
    OnDiscovery,
    /// Recorded only once the send for that item has been confirmed.
    #[default]
    OnDelivery,
}

#[derive(Debug, Default)]
pub struct FilterOutcome {
    /// Novel items in source order.
    pub novel: Vec<NovelItem>,
    pub already_seen: usize,
    pub stale: usize,
    pub unidentified: usize,
}

pub struct NoveltyFilter {
    cutoff: DateTime<Utc>,
    policy: MarkSeen,
}

impl NoveltyFilter {
    pub fn new(cutoff: DateTime<Utc>, policy: MarkSeen) -> Self {
        Self { cutoff, policy }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    pub fn policy(&self) -> MarkSeen {
        self.policy
    }

    /// Select the items of one feed that are unseen and published at or
    /// after the cutoff, updating `seen` according to the mark policy.
    pub fn filter_feed(&self, feed_id: &str, items: Vec<FeedItem>, seen: &mut SeenSet) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        let mut queued: HashSet<String> = HashSet::new();

        for item in items {
            let Some(identifier) = item.identifier.clone() else {
                outcome.unidentified += 1;
                continue;
            };

            if seen.contains(&identifier) || queued.contains(&identifier) {
                outcome.already_seen += 1;
                continue;
            }

            if item.effective_published() < self.cutoff {
                debug!("Outside window, marking seen: {}", identifier);
                seen.insert(identifier);
                outcome.stale += 1;
                continue;
            }

            if self.policy == MarkSeen::OnDiscovery {
                seen.insert(identifier.clone());
            }
            queued.insert(identifier.clone());

            info!("Queued: {}", item.display_title());
            outcome.novel.push(NovelItem {
                feed_id: feed_id.to_string(),
                identifier,
                item,
            });
        }

        debug!(
            "Feed {}: {} novel, {} already seen, {} stale, {} without link",
            feed_id,
            outcome.novel.len(),
            outcome.already_seen,
            outcome.stale,
            outcome.unidentified
        );

        outcome
    }
}
