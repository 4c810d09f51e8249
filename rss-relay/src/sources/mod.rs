pub mod http_feed;

pub use http_feed::HttpFeedSource;
