use clap::Parser;
use rss_relay::{Cli, DiscordWebhook, HttpFeedSource, RssRelay};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be populated
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Cli::parse().into_config().map_err(|e| {
        error!("{}", e);
        e
    })?;

    info!(
        "Starting RSS relay: {} feeds, {} rich hosts, state file {}",
        config.feeds.len(),
        config.rich_hosts.len(),
        config.state_file_path.display()
    );

    let source = Arc::new(HttpFeedSource::new(config.fetch.clone())?);
    let webhook = DiscordWebhook::new(
        &config.webhook_url,
        Duration::from_secs(config.fetch.timeout_seconds.max(30)),
    )?;
    info!("Posting to {}", webhook.redacted_url());

    let relay = RssRelay::new(config, source, Arc::new(webhook));

    match relay.run().await {
        Ok(summary) => {
            info!(
                "Run {} finished: {} queued, {} delivered, {} feeds skipped",
                summary.run_id, summary.queued, summary.delivered, summary.feeds_failed
            );
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
