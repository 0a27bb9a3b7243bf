//! Redis pub/sub backend

use async_trait::async_trait;
use futures::StreamExt;
use redis::Msg;
use redis::aio::PubSub;
use tracing::{debug, info};

use super::{BusMessage, MessageBus, MessageStream};
use crate::error::{ListenerError, Result};

/// Pub/sub connection to a Redis server
pub struct RedisBus {
    pubsub: Option<PubSub>,
}

impl RedisBus {
    /// Opens a pub/sub connection
    ///
    /// # Arguments
    /// * `url` - Server URL (e.g., "redis://localhost")
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let pubsub = client.get_async_pubsub().await?;
        info!(url, "Connected to Redis");

        Ok(Self {
            pubsub: Some(pubsub),
        })
    }

    fn connection(&mut self) -> Result<&mut PubSub> {
        self.pubsub.as_mut().ok_or(ListenerError::Closed)
    }
}

#[async_trait]
impl MessageBus for RedisBus {
    async fn subscribe(&mut self, channels: &[String]) -> Result<()> {
        let conn = self.connection()?;
        for channel in channels {
            conn.subscribe(channel).await?;
            debug!(channel = %channel, "Subscribed");
        }
        Ok(())
    }

    async fn psubscribe(&mut self, patterns: &[String]) -> Result<()> {
        let conn = self.connection()?;
        for pattern in patterns {
            conn.psubscribe(pattern).await?;
            debug!(pattern = %pattern, "Subscribed to pattern");
        }
        Ok(())
    }

    async fn unsubscribe(&mut self, channels: &[String]) -> Result<()> {
        let conn = self.connection()?;
        for channel in channels {
            conn.unsubscribe(channel).await?;
        }
        Ok(())
    }

    async fn punsubscribe(&mut self, patterns: &[String]) -> Result<()> {
        let conn = self.connection()?;
        for pattern in patterns {
            conn.punsubscribe(pattern).await?;
        }
        Ok(())
    }

    fn messages(&mut self) -> MessageStream<'_> {
        match self.pubsub.as_mut() {
            Some(pubsub) => pubsub.on_message().map(|msg| to_bus_message(&msg)).boxed(),
            None => futures::stream::empty().boxed(),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.pubsub.take().is_some() {
            info!("Redis connection released");
        }
        Ok(())
    }
}

fn to_bus_message(msg: &Msg) -> Result<BusMessage> {
    let channel: Vec<u8> = msg
        .get_channel()
        .map_err(|e| ListenerError::decode("<unknown>", e.to_string()))?;
    let pattern = if msg.from_pattern() {
        let pattern: Vec<u8> = msg.get_pattern().map_err(|e| {
            ListenerError::decode(String::from_utf8_lossy(&channel), e.to_string())
        })?;
        Some(pattern)
    } else {
        None
    };

    Ok(BusMessage {
        channel,
        pattern,
        payload: msg.get_payload_bytes().to_vec(),
    })
}
