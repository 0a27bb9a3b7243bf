//! Channel listener
//!
//! Subscribes a [`MessageBus`] to a set of channels and hands every decoded
//! message to a [`MessageHandler`]. Each message runs on its own task, so a
//! slow or failing handler never blocks the receive loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::bus::{BusMessage, ChannelSubscription, MessageBus, partition};
use crate::error::{ListenerError, Result};

/// How long teardown waits for running handlers before aborting them
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Application callback for incoming messages
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Processes one message
    ///
    /// Errors are logged and do not stop the listener.
    async fn handle_message(&self, channel: &str, message: &str) -> anyhow::Result<()>;
}

/// A decoded message ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
struct Delivery {
    channel: String,
    pattern: Option<String>,
    message: String,
}

impl TryFrom<BusMessage> for Delivery {
    type Error = ListenerError;

    fn try_from(raw: BusMessage) -> Result<Self> {
        let channel = String::from_utf8(raw.channel).map_err(|e| {
            ListenerError::decode(String::from_utf8_lossy(e.as_bytes()), "channel is not UTF-8")
        })?;
        let message = String::from_utf8(raw.payload)
            .map_err(|_| ListenerError::decode(channel.clone(), "payload is not UTF-8"))?;
        let pattern = raw
            .pattern
            .map(|pattern| String::from_utf8_lossy(&pattern).into_owned());
        Ok(Self {
            channel,
            pattern,
            message,
        })
    }
}

/// Dispatches bus messages to a handler
pub struct Listener<B: MessageBus, H: MessageHandler> {
    bus: B,
    handler: Arc<H>,
    channels: Vec<String>,
    patterns: Vec<String>,
    in_flight: JoinSet<()>,
    drain_timeout: Duration,
}

impl<B: MessageBus, H: MessageHandler> Listener<B, H> {
    /// Subscribes to `channels` and prepares dispatch to `handler`
    ///
    /// Specifiers ending in `*` become pattern subscriptions, the rest are
    /// subscribed by exact name.
    pub async fn new<I, S>(mut bus: B, channels: I, handler: H) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let subscriptions: Vec<ChannelSubscription> =
            channels.into_iter().map(ChannelSubscription::parse).collect();
        let (channels, patterns) = partition(&subscriptions);

        if !channels.is_empty() {
            bus.subscribe(&channels).await?;
        }
        if !patterns.is_empty() {
            bus.psubscribe(&patterns).await?;
        }
        info!(?channels, ?patterns, "Listener subscribed");

        Ok(Self {
            bus,
            handler: Arc::new(handler),
            channels,
            patterns,
            in_flight: JoinSet::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        })
    }

    /// Bounds how long shutdown waits for running handlers
    ///
    /// Handlers still running when the timeout expires are aborted.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Exact channel names subscribed
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Channel patterns subscribed
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Runs until interrupted with Ctrl-C
    pub async fn start(self) -> Result<()> {
        self.start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs until the message stream ends or `shutdown` resolves
    ///
    /// Subscriptions are dropped and the connection released exactly once on
    /// the way out. Handlers still running at that point get up to the drain
    /// timeout to finish and are aborted after it.
    pub async fn start_with_shutdown<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Listener started");

        let outcome = tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("Shutdown requested");
                Ok(())
            }
        };

        self.teardown().await;
        outcome
    }

    /// Receives and dispatches messages until the bus stream ends
    ///
    /// Subscriptions stay in place afterwards; [`start`](Self::start) and
    /// [`start_with_shutdown`](Self::start_with_shutdown) also tear them down.
    pub async fn run(&mut self) -> Result<()> {
        let Self {
            bus,
            handler,
            in_flight,
            ..
        } = self;
        let mut messages = bus.messages();

        while let Some(item) = messages.next().await {
            while let Some(finished) = in_flight.try_join_next() {
                report(finished);
            }

            let delivery = match item.and_then(Delivery::try_from) {
                Ok(delivery) => delivery,
                Err(e) => {
                    warn!("Skipping message: {}", e);
                    continue;
                }
            };

            debug!(
                channel = %delivery.channel,
                pattern = delivery.pattern.as_deref(),
                "Dispatching message"
            );
            let handler = Arc::clone(handler);
            in_flight.spawn(async move {
                if let Err(e) = handler
                    .handle_message(&delivery.channel, &delivery.message)
                    .await
                {
                    error!(channel = %delivery.channel, "Message handler failed: {:#}", e);
                }
            });
        }

        info!("Message stream ended");
        Ok(())
    }

    async fn teardown(&mut self) {
        if !self.channels.is_empty() {
            if let Err(e) = self.bus.unsubscribe(&self.channels).await {
                warn!("Failed to unsubscribe: {}", e);
            }
        }
        if !self.patterns.is_empty() {
            if let Err(e) = self.bus.punsubscribe(&self.patterns).await {
                warn!("Failed to unsubscribe from patterns: {}", e);
            }
        }
        if let Err(e) = self.bus.close().await {
            warn!("Failed to close bus connection: {}", e);
        }

        let pending = self.in_flight.len();
        if pending > 0 {
            info!("Waiting for {} running handler(s)", pending);
        }

        let drain_timeout = self.drain_timeout;
        let in_flight = &mut self.in_flight;
        let drained = tokio::time::timeout(drain_timeout, async {
            while let Some(finished) = in_flight.join_next().await {
                report(finished);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                "Aborting {} handler(s) still running after {:?}",
                self.in_flight.len(),
                drain_timeout
            );
            self.in_flight.abort_all();
            while self.in_flight.join_next().await.is_some() {}
        }

        info!("Listener stopped");
    }
}

fn report(finished: std::result::Result<(), JoinError>) {
    if let Err(e) = finished {
        if e.is_panic() {
            error!("Message handler panicked");
        } else {
            warn!("Message handler was cancelled: {}", e);
        }
    }
}
