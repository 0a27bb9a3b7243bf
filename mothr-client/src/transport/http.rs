//! HTTP request/response transport

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use tracing::debug;

use super::{Operation, RequestTransport, Response};
use crate::error::{ClientError, Result};

/// Sends operations as JSON `POST` requests
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Endpoint URL (e.g., "http://localhost:8080/query")
    url: String,
    /// HTTP client instance
    client: Client,
}

impl HttpTransport {
    /// Create a new transport for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, Client::new())
    }

    /// Create a new transport with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Checks the status code and decodes the body
    async fn handle_response(&self, response: reqwest::Response) -> Result<Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

#[async_trait]
impl RequestTransport for HttpTransport {
    async fn execute(
        &self,
        operation: &Operation,
        authorization: Option<&str>,
    ) -> Result<Response> {
        debug!(url = %self.url, authenticated = authorization.is_some(), "Sending operation");

        let mut request = self.client.post(&self.url).json(operation);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }
}
