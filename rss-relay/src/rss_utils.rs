//! RSS-specific utility functions for the relay

/// URL utilities for feeds and item links
pub mod url {
    use url::Url;

    /// Extract the hostname from a link, if it parses as an absolute URL
    pub fn extract_hostname(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_string()))
    }

    /// Substring match of `hostname` against any entry of `hosts`
    pub fn host_matches_any(hostname: &str, hosts: &[String]) -> bool {
        hosts.iter().any(|host| hostname.contains(host.as_str()))
    }

    /// Validate feed URL format
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }
}

/// Time utilities for the recency window
pub mod time {
    use chrono::{DateTime, Duration, Utc};

    /// Start of the recency window, measured back from `now`
    pub fn cutoff(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
        now - window
    }

    /// Format duration in human-readable form
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.num_seconds();

        if total_seconds < 60 {
            format!("{}s", total_seconds)
        } else if total_seconds < 3600 {
            format!("{}m", total_seconds / 60)
        } else if total_seconds < 86400 {
            format!("{}h", total_seconds / 3600)
        } else {
            format!("{}d", total_seconds / 86400)
        }
    }
}

/// Feed text utilities
pub mod feed {
    /// Extract clean text content from HTML, with entities decoded
    pub fn extract_text_from_html(html: &str) -> String {
        let text = html
            .chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => (text, true),
                '>' => {
                    // keep words on either side of a tag apart
                    text.push(' ');
                    (text, false)
                }
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0;

        html_escape::decode_html_entities(&text)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Truncate to at most `max_chars` characters, respecting char boundaries
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        match text.char_indices().nth(max_chars) {
            Some((idx, _)) => text[..idx].to_string(),
            None => text.to_string(),
        }
    }
}
