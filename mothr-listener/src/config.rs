//! Listener configuration
//!
//! Defines where the pub/sub broker lives and which channels to listen on.

use crate::error::{ListenerError, Result};

/// Environment variable holding the broker host
pub const REDIS_HOST_VAR: &str = "REDIS_HOST";

/// Broker host used when nothing else is configured
pub const DEFAULT_REDIS_HOST: &str = "localhost";

/// Listener configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Broker host, optionally with a port (e.g., "localhost:6379")
    pub redis_host: String,

    /// Channel names or patterns; a trailing `*` marks a pattern
    pub channels: Vec<String>,
}

impl ListenerConfig {
    /// Creates a new configuration
    pub fn new(redis_host: impl Into<String>, channels: Vec<String>) -> Self {
        Self {
            redis_host: redis_host.into(),
            channels,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - REDIS_HOST (optional, default: localhost)
    ///
    /// Channels start out empty; add them with [`with_channels`](Self::with_channels).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let redis_host = lookup(REDIS_HOST_VAR)
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string());
        Self::new(redis_host, Vec::new())
    }

    pub fn with_redis_host(mut self, host: impl Into<String>) -> Self {
        self.redis_host = host.into();
        self
    }

    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels.extend(channels.into_iter().map(Into::into));
        self
    }

    /// Connection URL for the broker
    pub fn redis_url(&self) -> String {
        format!("redis://{}", self.redis_host)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.redis_host.is_empty() {
            return Err(ListenerError::Config("redis_host cannot be empty".into()));
        }

        if self.channels.is_empty() {
            return Err(ListenerError::Config(
                "at least one channel is required".into(),
            ));
        }

        if self.channels.iter().any(|c| c.is_empty()) {
            return Err(ListenerError::Config("channel names cannot be empty".into()));
        }

        Ok(())
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REDIS_HOST, Vec::new())
    }
}
