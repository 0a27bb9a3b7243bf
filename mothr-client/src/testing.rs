//! Scripted transports for unit tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::credentials::InMemoryCredentialStore;
use crate::error::{ClientError, Result};
use crate::transport::{
    Operation, RequestTransport, Response, SubscriptionStream, SubscriptionTransport,
};
use crate::MothrClient;

/// An operation as the transport saw it
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub query: String,
    pub variables: Map<String, Value>,
    pub authorization: Option<String>,
}

/// Replies to operations with queued responses, in order
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Response>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_data(&self, data: Value) {
        self.push_response(Response::from_data(data));
    }

    pub fn push_response(&self, response: Response) {
        self.responses.lock().push_back(Ok(response));
    }

    pub fn push_error(&self, error: ClientError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RequestTransport for ScriptedTransport {
    async fn execute(
        &self,
        operation: &Operation,
        authorization: Option<&str>,
    ) -> Result<Response> {
        self.calls.lock().push(RecordedCall {
            query: operation.query.clone(),
            variables: operation.variables.clone(),
            authorization: authorization.map(str::to_string),
        });
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::ParseError("no scripted response left".into())))
    }
}

/// Counts released subscriptions when dropped
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Serves one queued event list per opened subscription
#[derive(Default)]
pub struct ScriptedSubscriptions {
    streams: Mutex<VecDeque<Vec<Response>>>,
    operations: Mutex<Vec<Operation>>,
    released: Arc<AtomicUsize>,
}

impl ScriptedSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_stream(&self, events: Vec<Value>) {
        self.streams
            .lock()
            .push_back(events.into_iter().map(Response::from_data).collect());
    }

    pub fn opened(&self) -> Vec<Operation> {
        self.operations.lock().clone()
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionTransport for ScriptedSubscriptions {
    async fn subscribe(
        &self,
        operation: &Operation,
        _authorization: Option<&str>,
    ) -> Result<SubscriptionStream> {
        self.operations.lock().push(operation.clone());
        let events = self
            .streams
            .lock()
            .pop_front()
            .ok_or_else(|| ClientError::Subscription("no scripted stream left".into()))?;

        let guard = ReleaseGuard(Arc::clone(&self.released));
        Ok(futures::stream::iter(events)
            .map(move |event| {
                let _held = &guard;
                Ok(event)
            })
            .boxed())
    }
}

/// Builds an unauthenticated client over scripted transports
pub fn client(
    requests: Arc<ScriptedTransport>,
    subscriptions: Arc<ScriptedSubscriptions>,
) -> MothrClient {
    MothrClient::from_parts(
        &ClientConfig::default(),
        requests,
        subscriptions,
        Arc::new(InMemoryCredentialStore::new()),
    )
}
