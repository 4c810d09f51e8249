use crate::types::{FeedId, ItemId, Result};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Identifiers already processed for one feed.
///
/// Backed by an LRU cache that is never promoted on lookup, so recency is
/// insertion order and eviction drops the oldest entries first. Unbounded
/// until a capacity is applied. Persisted as a plain JSON list of strings,
/// oldest first.
#[derive(Serialize, Deserialize)]
#[serde(from = "Vec<ItemId>", into = "Vec<ItemId>")]
pub struct SeenSet {
    entries: LruCache<ItemId, ()>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains(id)
    }

    /// Returns `false` if the identifier was already present.
    pub fn insert(&mut self, id: impl Into<ItemId>) -> bool {
        let id = id.into();
        if self.entries.contains(&id) {
            return false;
        }
        if let Some((evicted, _)) = self.entries.push(id, ()) {
            debug!("Evicted seen identifier {}", evicted);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.entries.iter().rev().map(|(id, _)| id)
    }

    /// Bound the set to `capacity`, dropping the oldest identifiers. Later
    /// inserts keep evicting at that bound. Returns how many were dropped.
    pub fn evict_to(&mut self, capacity: NonZeroUsize) -> usize {
        let before = self.entries.len();
        self.entries.resize(capacity);
        before - self.entries.len()
    }
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SeenSet {
    fn clone(&self) -> Self {
        let mut entries = LruCache::unbounded();
        for id in self.iter() {
            entries.push(id.clone(), ());
        }
        entries.resize(self.entries.cap());
        Self { entries }
    }
}

impl fmt::Debug for SeenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl PartialEq for SeenSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|id| other.contains(id))
    }
}

impl Eq for SeenSet {}

impl From<Vec<ItemId>> for SeenSet {
    fn from(ids: Vec<ItemId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<SeenSet> for Vec<ItemId> {
    fn from(set: SeenSet) -> Self {
        set.iter().cloned().collect()
    }
}

impl<S: Into<ItemId>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SeenSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Feed identifier to seen set, for every feed ever processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    feeds: BTreeMap<FeedId, SeenSet>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, feed_id: &str) -> Option<&SeenSet> {
        self.feeds.get(feed_id)
    }

    /// Seen set for `feed_id`, created empty on first use.
    pub fn seen_mut(&mut self, feed_id: &str) -> &mut SeenSet {
        self.feeds.entry(feed_id.to_string()).or_default()
    }

    pub fn insert_feed(&mut self, feed_id: impl Into<FeedId>, seen: SeenSet) {
        self.feeds.insert(feed_id.into(), seen);
    }

    pub fn feed_ids(&self) -> impl Iterator<Item = &FeedId> {
        self.feeds.keys()
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn total_seen(&self) -> usize {
        self.feeds.values().map(SeenSet::len).sum()
    }

    /// Apply the per-feed capacity to every seen set. Returns the number of evicted identifiers.
    pub fn enforce_capacity(&mut self, capacity: NonZeroUsize) -> usize {
        self.feeds
            .values_mut()
            .map(|seen| seen.evict_to(capacity))
            .sum()
    }

    /// Remove state for feeds not in `configured`. Returns the removed feed ids.
    pub fn retain_feeds(&mut self, configured: &[FeedId]) -> Vec<FeedId> {
        let keep: HashSet<&str> = configured.iter().map(String::as_str).collect();
        let removed: Vec<FeedId> = self
            .feeds
            .keys()
            .filter(|id| !keep.contains(id.as_str()))
            .cloned()
            .collect();
        for id in &removed {
            self.feeds.remove(id);
        }
        removed
    }
}

/// JSON file persistence for `State`.
pub struct StateStore {
    path: PathBuf,
    max_seen_per_feed: Option<NonZeroUsize>,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_seen_per_feed: None,
        }
    }

    /// Cap each feed's seen set; `None` or `Some(0)` keeps everything.
    pub fn with_max_seen_per_feed(mut self, capacity: Option<usize>) -> Self {
        self.max_seen_per_feed = capacity.and_then(NonZeroUsize::new);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted state. Any read or parse failure yields an empty state.
    pub async fn load(&self) -> State {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No state file at {}, starting fresh", self.path.display());
                return State::new();
            }
            Err(e) => {
                warn!("Failed to read state file {}: {}, starting fresh", self.path.display(), e);
                return State::new();
            }
        };

        let mut state: State = match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!("State file {} is not valid: {}, starting fresh", self.path.display(), e);
                return State::new();
            }
        };

        if let Some(capacity) = self.max_seen_per_feed {
            let evicted = state.enforce_capacity(capacity);
            if evicted > 0 {
                debug!("Evicted {} seen identifiers on load", evicted);
            }
        }

        info!(
            "Loaded state for {} feeds ({} seen items)",
            state.len(),
            state.total_seen()
        );
        state
    }

    /// Overwrite the state file with `state`. The write goes to a sibling
    /// temporary file first and is renamed into place.
    pub async fn save(&self, state: &State) -> Result<()> {
        info!("Saving state to {}…", self.path.display());
        let start = Instant::now();

        let mut state = state.clone();
        if let Some(capacity) = self.max_seen_per_feed {
            state.enforce_capacity(capacity);
        }

        let json = serde_json::to_string_pretty(&state)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        info!("State saved in {} ms", start.elapsed().as_millis());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
