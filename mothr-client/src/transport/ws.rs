//! WebSocket subscription transport
//!
//! Speaks the `graphql-ws` sub-protocol: `connection_init` is answered by
//! `connection_ack`, a `start` message opens the subscription, and the
//! server pushes `data` events until it sends `complete`.

use async_trait::async_trait;
use futures::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Operation, Response, SubscriptionStream, SubscriptionTransport};
use crate::error::{ClientError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const PROTOCOL: &str = "graphql-ws";

/// Opens one WebSocket connection per subscription
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    /// Subscription endpoint (e.g., "ws://localhost:8080/query")
    url: String,
}

/// Message pushed by the server
#[derive(Debug, Deserialize)]
struct ServerMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Option<Value>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SubscriptionTransport for WebSocketTransport {
    async fn subscribe(
        &self,
        operation: &Operation,
        authorization: Option<&str>,
    ) -> Result<SubscriptionStream> {
        let mut request = self.url.as_str().into_client_request()?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(PROTOCOL));

        let (mut ws, _) = connect_async(request).await?;
        debug!(url = %self.url, "Subscription connection established");

        let payload = match authorization {
            Some(value) => json!({ "Authorization": value }),
            None => json!({}),
        };
        send_json(&mut ws, &json!({ "type": "connection_init", "payload": payload })).await?;
        wait_for_ack(&mut ws).await?;

        let id = Uuid::new_v4().to_string();
        send_json(
            &mut ws,
            &json!({ "id": id, "type": "start", "payload": operation }),
        )
        .await?;
        debug!(subscription_id = %id, "Subscription started");

        Ok(Box::pin(events(ws, id)))
    }
}

async fn send_json(ws: &mut WsStream, value: &Value) -> Result<()> {
    ws.send(Message::Text(serde_json::to_string(value)?.into()))
        .await?;
    Ok(())
}

/// Reads the next protocol message, skipping non-text frames
async fn next_message(ws: &mut WsStream) -> Result<Option<ServerMessage>> {
    while let Some(frame) = ws.next().await {
        match frame? {
            Message::Text(text) => return Ok(Some(serde_json::from_str(text.as_str())?)),
            Message::Close(_) => return Ok(None),
            _ => continue,
        }
    }
    Ok(None)
}

async fn wait_for_ack(ws: &mut WsStream) -> Result<()> {
    loop {
        match next_message(ws).await? {
            Some(msg) if msg.kind == "connection_ack" => return Ok(()),
            Some(msg) if msg.kind == "ka" => continue,
            Some(msg) if msg.kind == "connection_error" => {
                return Err(ClientError::Subscription(format!(
                    "connection rejected: {}",
                    describe(msg.payload)
                )));
            }
            Some(msg) => {
                warn!(kind = %msg.kind, "Unexpected message before connection_ack");
            }
            None => {
                return Err(ClientError::Subscription(
                    "connection closed before acknowledgement".into(),
                ));
            }
        }
    }
}

/// Turns server messages into subscription events
///
/// The socket lives inside the stream, so dropping the stream releases the
/// connection. When the server completes the subscription, the client
/// answers with `stop` and a close frame.
fn events(mut ws: WsStream, id: String) -> impl Stream<Item = Result<Response>> + Send + 'static {
    async_stream::try_stream! {
        while let Some(msg) = next_message(&mut ws).await? {
            match msg.kind.as_str() {
                "data" => {
                    let payload = msg.payload.unwrap_or(Value::Null);
                    let response: Response = serde_json::from_value(payload)?;
                    yield response;
                }
                "error" | "connection_error" => {
                    Err::<(), _>(ClientError::Subscription(describe(msg.payload)))?;
                }
                "complete" => break,
                _ => continue,
            }
        }

        debug!(subscription_id = %id, "Subscription finished");
        let _ = send_json(&mut ws, &json!({ "id": id, "type": "stop" })).await;
        let _ = ws.close(None).await;
    }
}

fn describe(payload: Option<Value>) -> String {
    match payload {
        Some(Value::String(text)) => text,
        Some(Value::Object(map)) if map.get("message").is_some_and(Value::is_string) => {
            map.get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        }
        Some(other) => other.to_string(),
        None => "no details".to_string(),
    }
}
