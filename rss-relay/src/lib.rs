pub mod types;
pub mod config;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod rss_utils;
pub mod state;
pub mod novelty;
pub mod render;
pub mod rate_limit;
pub mod scheduler;
pub mod webhook;
pub mod relay;

pub use types::*;
pub use config::{Cli, RelayConfig};
pub use traits::{FeedSource, MessageSink};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sources::HttpFeedSource;
pub use state::{SeenSet, State, StateStore};
pub use novelty::{FilterOutcome, MarkSeen, NoveltyFilter};
pub use render::{MessageRenderer, OutboundMessage, RenderMode};
pub use rate_limit::RateLimiter;
pub use scheduler::{DeliveryReport, DeliveryScheduler};
pub use webhook::DiscordWebhook;
pub use relay::RssRelay;
