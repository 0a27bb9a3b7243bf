//! Session and authentication
//!
//! [`SessionManager`] owns the bearer credential. It performs login and
//! refresh, and attaches the current credential to every operation sent
//! through its request transport. Operations already in flight keep the
//! credential they were sent with.

use std::sync::Arc;

use mothr_core::dto::auth::{LoginTokens, RefreshedToken};
use tracing::{debug, info};

use crate::credentials::{Credential, CredentialStore};
use crate::error::{ClientError, Result};
use crate::operations;
use crate::transport::{Operation, RequestTransport, Response};

/// Holds the credential and sends authenticated operations
pub struct SessionManager {
    transport: Arc<dyn RequestTransport>,
    store: Arc<dyn CredentialStore>,
    default_username: Option<String>,
    default_password: Option<String>,
}

impl SessionManager {
    /// Creates a session over `transport` keeping its credential in `store`
    pub fn new(transport: Arc<dyn RequestTransport>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport,
            store,
            default_username: None,
            default_password: None,
        }
    }

    /// Sets the username and password [`login`](Self::login) falls back to
    pub fn with_default_credentials(
        mut self,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        self.default_username = username;
        self.default_password = password;
        self
    }

    /// Current credential, if any
    pub fn credential(&self) -> Option<Credential> {
        self.store.load()
    }

    /// Current `Authorization` header value, if any
    pub fn authorization(&self) -> Option<String> {
        self.store.load().map(|c| c.bearer())
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.load().is_some()
    }

    /// Uses `token` verbatim as the access token
    pub fn set_token(&self, token: impl Into<String>) {
        self.store.store(Credential::new(token, None));
    }

    /// Logs in and stores the returned tokens
    ///
    /// Missing arguments fall back to the session's default credentials.
    ///
    /// # Returns
    /// The access token and, if the service issued one, the refresh token
    ///
    /// # Errors
    /// `ClientError::Auth` if a username or password cannot be resolved or
    /// the service returns no tokens
    pub async fn login(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(String, Option<String>)> {
        let username = username
            .or(self.default_username.as_deref())
            .ok_or_else(|| ClientError::Auth("Username not provided".into()))?;
        let password = password
            .or(self.default_password.as_deref())
            .ok_or_else(|| ClientError::Auth("Password not provided".into()))?;

        let response = self
            .execute(&operations::login(username, password))
            .await?;
        let tokens: LoginTokens = response
            .field("login")?
            .ok_or_else(|| ClientError::Auth(failure("Login failed", &response)))?;

        self.store
            .store(Credential::new(tokens.token.clone(), tokens.refresh.clone()));
        info!(username, "Logged in");

        Ok((tokens.token, tokens.refresh))
    }

    /// Exchanges the stored refresh token for a new access token
    ///
    /// The refresh token itself is kept. Operations sent after this call
    /// returns use the new access token.
    pub async fn refresh(&self) -> Result<String> {
        let refresh_token = self
            .store
            .load()
            .and_then(|c| c.refresh_token)
            .ok_or_else(|| ClientError::Auth("No refresh token available".into()))?;

        let response = self.execute(&operations::refresh(&refresh_token)).await?;
        let refreshed: RefreshedToken = response
            .field("refresh")?
            .ok_or_else(|| ClientError::Auth(failure("Token refresh failed", &response)))?;

        self.store.store(Credential::new(
            refreshed.token.clone(),
            Some(refresh_token),
        ));
        debug!("Access token refreshed");

        Ok(refreshed.token)
    }

    /// Sends `operation` with the current credential attached
    pub async fn execute(&self, operation: &Operation) -> Result<Response> {
        let authorization = self.authorization();
        self.transport
            .execute(operation, authorization.as_deref())
            .await
    }
}

fn failure(reason: &str, response: &Response) -> String {
    match response.error_messages() {
        Some(errors) => format!("{reason}: {}", errors.join("; ")),
        None => reason.to_string(),
    }
}
