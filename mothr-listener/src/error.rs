//! Error types for the listener

use thiserror::Error;

/// Result type alias for listener operations
pub type Result<T> = std::result::Result<T, ListenerError>;

/// Errors that can occur while listening on the bus
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The broker connection failed
    #[error("Bus connection failed: {0}")]
    Connection(#[from] redis::RedisError),

    /// A message could not be decoded
    #[error("Failed to decode message on {channel}: {reason}")]
    Decode { channel: String, reason: String },

    /// The bus connection has already been released
    #[error("Bus connection is closed")]
    Closed,

    /// Invalid listener configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ListenerError {
    pub fn decode(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}
