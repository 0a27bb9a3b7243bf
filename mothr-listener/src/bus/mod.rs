//! Publish/subscribe bus
//!
//! The listener only sees the [`MessageBus`] trait. [`RedisBus`] is the
//! production backend.

mod redis_bus;

pub use redis_bus::RedisBus;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// Marker that turns a channel specifier into a pattern
pub const WILDCARD: char = '*';

/// One channel the listener is subscribed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSubscription {
    pub pattern_or_name: String,
    pub is_wildcard: bool,
}

impl ChannelSubscription {
    /// A specifier ending in `*` subscribes as a pattern, anything else as a name
    pub fn parse(spec: impl Into<String>) -> Self {
        let pattern_or_name = spec.into();
        let is_wildcard = pattern_or_name.ends_with(WILDCARD);
        Self {
            pattern_or_name,
            is_wildcard,
        }
    }
}

/// Splits subscriptions into exact names and patterns, keeping their order
pub fn partition(subscriptions: &[ChannelSubscription]) -> (Vec<String>, Vec<String>) {
    let (patterns, names): (Vec<_>, Vec<_>) =
        subscriptions.iter().partition(|s| s.is_wildcard);
    (
        names.into_iter().map(|s| s.pattern_or_name.clone()).collect(),
        patterns.into_iter().map(|s| s.pattern_or_name.clone()).collect(),
    )
}

/// Raw message as received from the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Concrete channel the message was published on
    pub channel: Vec<u8>,
    /// Pattern that matched, for pattern subscriptions
    pub pattern: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

/// Stream of incoming messages from every subscription
pub type MessageStream<'a> = BoxStream<'a, Result<BusMessage>>;

/// Connection to a publish/subscribe broker
#[async_trait]
pub trait MessageBus: Send {
    /// Subscribes to exact channel names
    async fn subscribe(&mut self, channels: &[String]) -> Result<()>;

    /// Subscribes to channel patterns
    async fn psubscribe(&mut self, patterns: &[String]) -> Result<()>;

    /// Drops exact channel subscriptions
    async fn unsubscribe(&mut self, channels: &[String]) -> Result<()>;

    /// Drops pattern subscriptions
    async fn punsubscribe(&mut self, patterns: &[String]) -> Result<()>;

    /// Messages from exact and pattern subscriptions, merged in arrival order
    fn messages(&mut self) -> MessageStream<'_>;

    /// Stops receiving and releases the connection
    async fn close(&mut self) -> Result<()>;
}
