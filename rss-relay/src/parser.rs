use crate::rss_utils::feed::extract_text_from_html;
use crate::types::{Enclosure, FeedItem, RelayError, Result};
use chrono::Utc;
use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use tracing::debug;

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub items: Vec<FeedItem>,
}

/// Converts RSS, Atom and JSON Feed documents into `FeedItem`s.
#[derive(Debug, Default, Clone)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed(&self, content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| RelayError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let items: Vec<FeedItem> = feed.entries.into_iter().map(Self::parse_entry).collect();

        debug!("Parsed feed with {} entries", items.len());

        Ok(ParsedFeed { title, items })
    }

    fn parse_entry(entry: Entry) -> FeedItem {
        let link = primary_link(&entry.links).map(|l| l.href.clone());

        // Atom entries frequently omit <published>
        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc));

        let snippet = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
            .map(|raw| extract_text_from_html(&raw))
            .filter(|text| !text.is_empty());

        let enclosure = entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .find_map(|c| {
                c.url.as_ref().map(|url| Enclosure {
                    url: url.to_string(),
                    media_type: c.content_type.as_ref().map(|m| m.to_string()),
                })
            })
            .or_else(|| {
                entry
                    .links
                    .iter()
                    .find(|l| l.rel.as_deref() == Some("enclosure"))
                    .map(|l| Enclosure {
                        url: l.href.clone(),
                        media_type: l.media_type.clone(),
                    })
            });

        FeedItem {
            identifier: link.clone(),
            title: entry.title.map(|t| t.content),
            published_at,
            link,
            snippet,
            enclosure,
        }
    }

    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<rdf:rdf")
            || content_lower.contains("<channel")
            || content_lower.contains("jsonfeed.org/version")
    }
}

/// Alternate (or untyped) link first, then anything that is not an enclosure.
fn primary_link(links: &[Link]) -> Option<&Link> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.iter().find(|l| l.rel.as_deref() != Some("enclosure")))
}
