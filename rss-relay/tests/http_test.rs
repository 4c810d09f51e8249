mod common;

use common::{init_tracing, serve_responses};
use rss_relay::{
    DiscordWebhook, FeedSource, FetchConfig, Fetcher, HttpFeedSource, MarkSeen, MessageSink, OutboundMessage,
    RelayConfig, RelayError, RssRelay,
};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn rss_document(items: &[(&str, &str)]) -> String {
    let entries: String = items
        .iter()
        .map(|(link, date)| {
            format!(
                "<item><title>{link}</title><link>{link}</link><pubDate>{date}</pubDate><description>About {link}</description></item>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Test</title><link>https://example.com/</link><description>t</description>{}</channel></rss>"#,
        entries
    )
}

fn fetch_config() -> FetchConfig {
    FetchConfig {
        timeout_seconds: 5,
        ..FetchConfig::default()
    }
}

#[tokio::test]
async fn http_source_parses_served_feed() {
    init_tracing();
    let body = rss_document(&[
        ("https://example.com/a", "Mon, 03 Mar 2025 10:00:00 GMT"),
        ("https://example.com/b", "Mon, 03 Mar 2025 11:00:00 GMT"),
    ]);
    let (base, requests) = serve_responses(vec![(200, "application/rss+xml", body)]).await;

    let source = HttpFeedSource::new(fetch_config()).unwrap();
    let items = source.fetch_feed(&format!("{}/rss.xml", base)).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].link.as_deref(), Some("https://example.com/a"));
    assert_eq!(items[1].snippet.as_deref(), Some("About https://example.com/b"));
    assert_eq!(requests.lock().unwrap()[0].request_line, "GET /rss.xml HTTP/1.1");
}

#[tokio::test]
async fn fetcher_returns_body_with_status() {
    init_tracing();
    let body = rss_document(&[("https://example.com/a", "Mon, 03 Mar 2025 10:00:00 GMT")]);
    let (base, _) = serve_responses(vec![(200, "application/rss+xml", body.clone())]).await;

    let url = format!("{}/rss.xml", base);
    let result = Fetcher::new(fetch_config()).unwrap().fetch_feed(&url).await.unwrap();

    assert_eq!(result.url, url);
    assert_eq!(result.http_status, 200);
    assert_eq!(result.content, body);
}

#[tokio::test]
async fn http_source_reports_error_status() {
    init_tracing();
    let (base, _) = serve_responses(vec![(404, "text/plain", "missing".to_string())]).await;

    let source = HttpFeedSource::new(fetch_config()).unwrap();
    let err = source.fetch_feed(&format!("{}/rss.xml", base)).await.unwrap_err();

    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn http_source_rejects_non_feed_content() {
    init_tracing();
    let (base, _) = serve_responses(vec![(200, "text/html", "<html><body>hi</body></html>".to_string())]).await;

    let source = HttpFeedSource::new(fetch_config()).unwrap();
    let err = source.fetch_feed(&base).await.unwrap_err();

    assert!(matches!(err, RelayError::Parse(_)));
}

#[tokio::test]
async fn webhook_posts_plain_payload_without_mentions() {
    init_tracing();
    let (base, requests) = serve_responses(vec![(200, "application/json", "{}".to_string())]).await;

    let webhook = DiscordWebhook::new(&format!("{}/api/webhooks/1/token", base), Duration::from_secs(5)).unwrap();
    webhook
        .send(&OutboundMessage::Plain("https://example.com/a".to_string()))
        .await
        .unwrap();

    let captured = requests.lock().unwrap();
    assert_eq!(captured[0].request_line, "POST /api/webhooks/1/token?wait=true HTTP/1.1");
    let body: serde_json::Value = serde_json::from_str(&captured[0].body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({"content": "https://example.com/a", "allowed_mentions": {"parse": []}})
    );
}

#[tokio::test]
async fn webhook_rejection_is_a_delivery_error() {
    init_tracing();
    let (base, _) = serve_responses(vec![(429, "application/json", r#"{"retry_after": 1.5}"#.to_string())]).await;

    let webhook = DiscordWebhook::new(&format!("{}/api/webhooks/1/token", base), Duration::from_secs(5)).unwrap();
    let err = webhook
        .send(&OutboundMessage::Plain("https://example.com/a".to_string()))
        .await
        .unwrap_err();

    match err {
        RelayError::Delivery { status, body } => {
            assert_eq!(status, 429);
            assert!(body.contains("retry_after"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn relay_over_http_end_to_end() {
    init_tracing();
    let feed_body = rss_document(&[
        ("https://news.example.com/late", "Mon, 03 Mar 2025 11:00:00 GMT"),
        ("https://news.example.com/early", "Mon, 03 Mar 2025 09:00:00 GMT"),
        ("https://news.example.com/ancient", "Mon, 03 Feb 2025 09:00:00 GMT"),
    ]);
    let (feed_base, _) = serve_responses(vec![(200, "application/rss+xml", feed_body)]).await;
    let (hook_base, posts) = serve_responses(vec![
        (200, "application/json", "{}".to_string()),
        (200, "application/json", "{}".to_string()),
    ])
    .await;

    let dir = tempdir().unwrap();
    let feed_url = format!("{}/rss.xml", feed_base);
    let config = RelayConfig {
        feeds: vec![feed_url.clone()],
        send_delay: Duration::ZERO,
        rich_hosts: vec!["example.com".to_string()],
        state_file_path: dir.path().join("state.json"),
        webhook_url: format!("{}/api/webhooks/1/token", hook_base),
        fetch: fetch_config(),
        mark_seen: MarkSeen::OnDelivery,
        ..RelayConfig::default()
    };

    let source = Arc::new(HttpFeedSource::new(config.fetch.clone()).unwrap());
    let webhook = Arc::new(DiscordWebhook::new(&config.webhook_url, Duration::from_secs(5)).unwrap());
    let relay = RssRelay::new(config, source, webhook);

    let summary = relay
        .run_at(Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(summary.delivered, 2);

    let posts = posts.lock().unwrap();
    let urls: Vec<String> = posts
        .iter()
        .map(|p| {
            let body: serde_json::Value = serde_json::from_str(&p.body).unwrap();
            body["embeds"][0]["url"].as_str().unwrap_or_default().to_string()
        })
        .collect();
    assert_eq!(urls, vec!["https://news.example.com/early", "https://news.example.com/late"]);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("state.json")).unwrap()).unwrap();
    assert_eq!(saved[feed_url.as_str()].as_array().map(|a| a.len()), Some(3));
}
