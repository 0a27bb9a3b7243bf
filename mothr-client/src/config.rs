//! Client configuration
//!
//! Resolves the endpoint and credentials the client starts with. Each value
//! comes from an explicit setter first, then from the environment, and is
//! otherwise left unset (which leaves the client unauthenticated).

use url::Url;

use crate::error::{ClientError, Result};

/// Environment variable holding the request/response endpoint
pub const ENDPOINT_VAR: &str = "MOTHR_ENDPOINT";
/// Environment variable holding a pre-issued access token
pub const TOKEN_VAR: &str = "MOTHR_ACCESS_TOKEN";
/// Environment variable holding the login username
pub const USERNAME_VAR: &str = "MOTHR_USERNAME";
/// Environment variable holding the login password
pub const PASSWORD_VAR: &str = "MOTHR_PASSWORD";

/// Endpoint used when nothing else is configured
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/query";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Request/response endpoint (e.g., "http://localhost:8080/query")
    pub endpoint: String,

    /// Access token used verbatim, skipping login
    pub token: Option<String>,

    /// Username for the login performed at connect time
    pub username: Option<String>,

    /// Password for the login performed at connect time
    pub password: Option<String>,
}

impl ClientConfig {
    /// Creates a configuration for `endpoint` with no credentials
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: None,
            username: None,
            password: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognised environment variables:
    /// - MOTHR_ENDPOINT (optional, default: http://localhost:8080/query)
    /// - MOTHR_ACCESS_TOKEN (optional)
    /// - MOTHR_USERNAME (optional)
    /// - MOTHR_PASSWORD (optional)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            endpoint: non_empty(ENDPOINT_VAR).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            token: non_empty(TOKEN_VAR),
            username: non_empty(USERNAME_VAR),
            password: non_empty(PASSWORD_VAR),
        }
    }

    /// Fills credentials left unset from the environment
    ///
    /// The endpoint and any credential already set are kept.
    pub fn or_env(self) -> Self {
        self.or_lookup(|key| std::env::var(key).ok())
    }

    /// Fills credentials left unset through an arbitrary variable lookup
    pub fn or_lookup<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fallback = Self::from_lookup(lookup);
        Self {
            endpoint: self.endpoint,
            token: self.token.or(fallback.token),
            username: self.username.or(fallback.username),
            password: self.password.or(fallback.password),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(ClientError::Config("endpoint cannot be empty".into()));
        }

        let url = self.parse_endpoint()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "endpoint must start with http:// or https://, got {}",
                self.endpoint
            )));
        }

        Ok(())
    }

    /// Derives the subscription endpoint by swapping the URL scheme
    ///
    /// `http` becomes `ws` and `https` becomes `wss`; host, port, path and
    /// query are kept.
    pub fn subscription_url(&self) -> Result<String> {
        let url = self.parse_endpoint()?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(ClientError::Config(format!(
                    "cannot derive subscription endpoint from scheme {other}"
                )));
            }
        };

        // Url::set_scheme refuses http -> ws, so rebuild from the remainder.
        let rest = &url.as_str()[url.scheme().len()..];
        Ok(format!("{scheme}{rest}"))
    }

    fn parse_endpoint(&self) -> Result<Url> {
        Url::parse(&self.endpoint)
            .map_err(|e| ClientError::Config(format!("invalid endpoint {}: {e}", self.endpoint)))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}
