//! Mothr Listener
//!
//! Long-running subscriber for job notifications published on a pub/sub
//! broker. Implement [`MessageHandler`] and hand it to a [`Listener`]:
//!
//! ```no_run
//! use async_trait::async_trait;
//! use mothr_listener::{Listener, ListenerConfig, MessageHandler, RedisBus};
//!
//! struct Print;
//!
//! #[async_trait]
//! impl MessageHandler for Print {
//!     async fn handle_message(&self, channel: &str, message: &str) -> anyhow::Result<()> {
//!         println!("{channel}: {message}");
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ListenerConfig::from_env().with_channels(["jobs", "jobs:*"]);
//! config.validate()?;
//! let bus = RedisBus::connect(&config.redis_url()).await?;
//! Listener::new(bus, config.channels.clone(), Print).await?.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod listener;

pub use bus::{BusMessage, ChannelSubscription, MessageBus, RedisBus};
pub use config::ListenerConfig;
pub use error::{ListenerError, Result};
pub use listener::{Listener, MessageHandler};
