//! Transport pair
//!
//! The client talks to the service over two independent connections:
//! - [`RequestTransport`]: one request, one reply (queries and mutations)
//! - [`SubscriptionTransport`]: long-lived push streams (subscriptions)
//!
//! Both are trait-based so the session and job request logic can be driven
//! by in-process fakes in tests. Closing one never affects the other.

mod http;
mod ws;

pub use http::HttpTransport;
pub use ws::WebSocketTransport;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, Result};

/// A query, mutation or subscription document with its variables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub query: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
}

impl Operation {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
        }
    }

    /// Binds a variable referenced by the document
    pub fn variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }
}

/// Error entry of a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub message: String,
}

/// Reply to an operation, or one event of a subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ResponseError>>,
}

impl Response {
    /// Builds a successful response around `data`
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    /// Messages of the error payload, if the response carries one
    pub fn error_messages(&self) -> Option<Vec<String>> {
        match &self.errors {
            Some(errors) if !errors.is_empty() => {
                Some(errors.iter().map(|e| e.message.clone()).collect())
            }
            _ => None,
        }
    }

    /// Decodes the top-level field `name`
    ///
    /// Returns `Ok(None)` when the field is missing or `null`. The error
    /// payload is ignored; callers decide how to report it.
    pub fn field<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.data.as_ref().and_then(|data| data.get(name)) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ClientError::ParseError(format!("Failed to decode {name}: {e}"))),
        }
    }

    /// Decodes the top-level field `name`, failing on errors or a missing value
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        if let Some(errors) = self.error_messages() {
            return Err(ClientError::Graphql(errors));
        }
        self.field(name)?
            .ok_or_else(|| ClientError::ParseError(format!("Response has no {name}")))
    }
}

/// Stream of subscription events
pub type SubscriptionStream = BoxStream<'static, Result<Response>>;

/// Request/response channel to the service
#[async_trait]
pub trait RequestTransport: Send + Sync {
    /// Sends one operation and awaits its reply
    ///
    /// # Arguments
    /// * `operation` - The document and variables to send
    /// * `authorization` - Value of the `Authorization` header, if any
    async fn execute(&self, operation: &Operation, authorization: Option<&str>)
    -> Result<Response>;
}

/// Push channel to the service
#[async_trait]
pub trait SubscriptionTransport: Send + Sync {
    /// Opens a subscription and returns its event stream
    ///
    /// The subscription is released when the returned stream is dropped.
    async fn subscribe(
        &self,
        operation: &Operation,
        authorization: Option<&str>,
    ) -> Result<SubscriptionStream>;
}
