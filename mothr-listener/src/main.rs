//! Mothr Listener
//!
//! Subscribes to job notification channels and logs every message received.
//! Stops on Ctrl-C.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mothr_listener::{Listener, ListenerConfig, MessageHandler, RedisBus};

#[derive(Parser)]
#[command(name = "mothr-listener")]
#[command(about = "Listen for job notifications on pub/sub channels", long_about = None)]
struct Args {
    /// Channels to subscribe to; a trailing '*' subscribes to a pattern
    #[arg(required = true)]
    channels: Vec<String>,

    /// Broker host, overrides REDIS_HOST
    #[arg(long)]
    redis_host: Option<String>,
}

struct LogHandler;

#[async_trait]
impl MessageHandler for LogHandler {
    async fn handle_message(&self, channel: &str, message: &str) -> anyhow::Result<()> {
        info!(channel, "{}", message);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mothr_listener=info,mothr_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = ListenerConfig::from_env().with_channels(args.channels);
    if let Some(host) = args.redis_host {
        config = config.with_redis_host(host);
    }
    config.validate()?;
    info!("Loaded configuration: redis_host={}", config.redis_host);

    let bus = RedisBus::connect(&config.redis_url())
        .await
        .context("Failed to connect to Redis")?;

    let listener = Listener::new(bus, config.channels.clone(), LogHandler)
        .await
        .context("Failed to subscribe")?;
    listener.start().await?;

    info!("Listener shut down");
    Ok(())
}
