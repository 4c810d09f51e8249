use crate::rss_utils::feed::truncate_chars;
use crate::rss_utils::url::{extract_hostname, host_matches_any};
use crate::types::NovelItem;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Longest snippet placed in a rich message description.
pub const SNIPPET_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Rich,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub url: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub author: EmbedAuthor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

/// Mention parsing rules sent with every message. An empty `parse` list
/// stops the destination from expanding user, role or everyone mentions.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
}

impl AllowedMentions {
    pub fn none() -> Self {
        Self { parse: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Rich(Embed),
    /// Bare link; markdown-wrapped links are not unfurled by the destination.
    Plain(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    pub allowed_mentions: AllowedMentions,
}

impl OutboundMessage {
    pub fn mode(&self) -> RenderMode {
        match self {
            OutboundMessage::Rich(_) => RenderMode::Rich,
            OutboundMessage::Plain(_) => RenderMode::Plain,
        }
    }

    pub fn to_payload(&self) -> WebhookPayload {
        match self {
            OutboundMessage::Rich(embed) => WebhookPayload {
                content: None,
                embeds: vec![embed.clone()],
                allowed_mentions: AllowedMentions::none(),
            },
            OutboundMessage::Plain(link) => WebhookPayload {
                content: Some(link.clone()),
                embeds: Vec::new(),
                allowed_mentions: AllowedMentions::none(),
            },
        }
    }
}

/// Chooses between rich and plain rendering from the link's hostname.
#[derive(Debug, Clone, Default)]
pub struct MessageRenderer {
    rich_hosts: Vec<String>,
}

impl MessageRenderer {
    pub fn new(rich_hosts: Vec<String>) -> Self {
        Self { rich_hosts }
    }

    pub fn mode_for(&self, link: &str) -> RenderMode {
        match self.rich_host(link) {
            Some(_) => RenderMode::Rich,
            None => RenderMode::Plain,
        }
    }

    /// Hostname of `link` when it is on the rich allow-list.
    fn rich_host(&self, link: &str) -> Option<String> {
        extract_hostname(link).filter(|hostname| host_matches_any(hostname, &self.rich_hosts))
    }

    /// `now` is used as the timestamp when the item has no publish date.
    pub fn render(&self, novel: &NovelItem, now: DateTime<Utc>) -> OutboundMessage {
        let item = &novel.item;
        let link = item.link.clone().unwrap_or_else(|| novel.identifier.clone());

        let Some(hostname) = self.rich_host(&link) else {
            return OutboundMessage::Plain(link);
        };

        let description = item
            .snippet
            .as_deref()
            .map(|s| truncate_chars(s, SNIPPET_MAX_CHARS))
            .filter(|s| !s.is_empty());

        OutboundMessage::Rich(Embed {
            url: link.clone(),
            title: item.title.clone().filter(|t| !t.is_empty()),
            description,
            timestamp: item.published_at.unwrap_or(now),
            author: EmbedAuthor {
                icon_url: format!("https://{}/favicon.ico", hostname),
                name: hostname,
                url: link,
            },
            image: item
                .enclosure
                .as_ref()
                .map(|e| EmbedImage { url: e.url.clone() }),
        })
    }
}
