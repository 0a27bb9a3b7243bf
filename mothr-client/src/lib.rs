//! Mothr Client
//!
//! An asynchronous client for submitting jobs to the Mothr job service,
//! tracking them and collecting their results.
//!
//! The client keeps two independent connections to the service: one for
//! queries and mutations, and one for subscriptions, whose URL is derived
//! from the first by swapping `http` for `ws` (`https` for `wss`).
//!
//! # Example
//!
//! ```no_run
//! use mothr_client::{ClientConfig, MothrClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = MothrClient::connect(ClientConfig::from_env()).await?;
//!
//!     let mut request = client.job_request("echo");
//!     request
//!         .add_input("s3://bucket/input.txt", Some("-i"))
//!         .add_output("s3://bucket/output.txt", Some("-o"));
//!
//!     let result = request.run_job(Duration::from_millis(250), false).await?;
//!     println!("Job finished: {:?}", result.status);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
mod operations;
pub mod request;
mod services;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::ClientConfig;
pub use credentials::{Credential, CredentialStore, InMemoryCredentialStore};
pub use error::{ClientError, Result};
pub use mothr_core::domain::job::{JobField, JobRecord, JobStatus};
pub use mothr_core::domain::parameter::{Parameter, ParameterKind};
pub use request::{Advisory, JobRequest, RunOptions};
pub use session::SessionManager;

use std::sync::Arc;

use tracing::{debug, info};

use crate::transport::{
    HttpTransport, RequestTransport, SubscriptionTransport, WebSocketTransport,
};

/// Client for the Mothr job service
///
/// Cheap to clone; clones share the session and both transports.
#[derive(Clone)]
pub struct MothrClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    endpoint: String,
    session: SessionManager,
    subscriptions: Arc<dyn SubscriptionTransport>,
}

impl MothrClient {
    /// Connects to the service described by `config`
    ///
    /// Token, username and password left unset in `config` fall back to
    /// `MOTHR_ACCESS_TOKEN`, `MOTHR_USERNAME` and `MOTHR_PASSWORD`.
    ///
    /// Authentication then follows the configuration:
    /// - a token is used verbatim and no login happens
    /// - otherwise, if both username and password are set, a login is
    ///   performed before this returns
    /// - otherwise the client stays unauthenticated
    ///
    /// # Example
    /// ```no_run
    /// # use mothr_client::{ClientConfig, MothrClient};
    /// # async fn example() -> anyhow::Result<()> {
    /// let config = ClientConfig::new("https://mothr.example.com/query")
    ///     .with_username("analyst")
    ///     .with_password("hunter2");
    /// let client = MothrClient::connect(config).await?;
    /// assert!(client.session().is_authenticated());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let config = config.or_env();
        config.validate()?;
        let subscription_url = config.subscription_url()?;
        debug!(endpoint = %config.endpoint, subscriptions = %subscription_url, "Creating transports");

        let client = Self::from_parts(
            &config,
            Arc::new(HttpTransport::new(config.endpoint.clone())),
            Arc::new(WebSocketTransport::new(subscription_url)),
            Arc::new(InMemoryCredentialStore::new()),
        );
        client.authenticate(&config).await?;

        Ok(client)
    }

    /// Connects using configuration resolved from the environment
    pub async fn from_env() -> Result<Self> {
        Self::connect(ClientConfig::from_env()).await
    }

    /// Assembles a client from explicit transports and credential store
    ///
    /// No authentication happens here; see [`authenticate`](Self::authenticate).
    pub fn from_parts(
        config: &ClientConfig,
        requests: Arc<dyn RequestTransport>,
        subscriptions: Arc<dyn SubscriptionTransport>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let session = SessionManager::new(requests, store)
            .with_default_credentials(config.username.clone(), config.password.clone());

        Self {
            inner: Arc::new(ClientInner {
                endpoint: config.endpoint.clone(),
                session,
                subscriptions,
            }),
        }
    }

    /// Applies the connect-time authentication policy for `config`
    ///
    /// A credential already present in the store is kept unless the
    /// configuration carries an explicit token.
    pub async fn authenticate(&self, config: &ClientConfig) -> Result<()> {
        let session = self.session();

        if let Some(token) = &config.token {
            session.set_token(token.clone());
            debug!("Using configured access token");
        } else if session.is_authenticated() {
            debug!("Using stored credential");
        } else if config.username.is_some() && config.password.is_some() {
            session.login(None, None).await?;
        } else {
            info!("No credentials configured, continuing unauthenticated");
        }

        Ok(())
    }

    /// Get the request/response endpoint
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Session holding the bearer credential
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    /// Logs in, see [`SessionManager::login`]
    pub async fn login(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(String, Option<String>)> {
        self.session().login(username, password).await
    }

    /// Refreshes the access token, see [`SessionManager::refresh`]
    pub async fn refresh_token(&self) -> Result<String> {
        self.session().refresh().await
    }

    /// Starts a new job request for `service`
    pub fn job_request(&self, service: impl Into<String>) -> JobRequest {
        JobRequest::new(self.clone(), service)
    }

    pub(crate) fn subscriptions(&self) -> &dyn SubscriptionTransport {
        self.inner.subscriptions.as_ref()
    }
}
