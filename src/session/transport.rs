//! Realtime channel transport
//!
//! The session manager talks to the remote service through a message-passing
//! pair: an outbound sender of [`ClientMessage`] and an inbound receiver of
//! [`SessionEvent`]. The production transport runs over a WebSocket; tests
//! supply a channel-backed fake.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::session::wire::{ClientMessage, ServerMessage, SessionSetup};
use crate::{Error, Result};

/// Default realtime endpoint of the hosted AI service
pub const DEFAULT_LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Lifecycle and payload events delivered by a transport
#[derive(Debug)]
pub enum SessionEvent {
    /// The channel is open and configured
    Open,
    /// A decoded server message
    Message(ServerMessage),
    /// The transport failed; the session is no longer usable
    Error(String),
    /// The channel closed, with the peer's reason if any
    Closed(String),
}

/// A live connection produced by a transport
pub struct RealtimeConnection {
    /// Sender for outbound messages; dropping it closes the channel
    pub outbound: mpsc::UnboundedSender<ClientMessage>,
    /// Receiver of inbound events
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl RealtimeConnection {
    /// Assemble a connection from raw channel halves (used by transports and
    /// by test fakes)
    #[must_use]
    pub fn from_parts(
        outbound: mpsc::UnboundedSender<ClientMessage>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            outbound,
            events,
            tasks,
        }
    }

    /// Close the connection and stop its IO tasks; idempotent
    pub fn close(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for RealtimeConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens realtime connections to the remote AI service
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Connect and configure a session
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] (or a websocket error) when the channel
    /// cannot be established.
    async fn connect(&self, setup: SessionSetup) -> Result<RealtimeConnection>;
}

/// WebSocket transport for the hosted realtime service
pub struct LiveApiTransport {
    endpoint: String,
    api_key: String,
}

impl LiveApiTransport {
    /// Create a transport against the default endpoint
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_LIVE_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Override the endpoint (e.g. a regional or mock service)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl RealtimeTransport for LiveApiTransport {
    async fn connect(&self, setup: SessionSetup) -> Result<RealtimeConnection> {
        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let (socket, _) = connect_async(url).await?;
        let (mut sink, mut stream) = socket.split();

        // The setup frame must be the first message on the wire
        let setup_text = serde_json::to_string(&ClientMessage::setup(setup))?;
        sink.send(Message::Text(setup_text.into()))
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<SessionEvent>();

        let writer_events = event_tx.clone();
        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping unserializable outbound message");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    let _ = writer_events.send(SessionEvent::Error(e.to_string()));
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader_events = event_tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        forward_payload(text.as_bytes(), &reader_events);
                    }
                    Ok(Message::Binary(bytes)) => {
                        forward_payload(&bytes, &reader_events);
                    }
                    Ok(Message::Close(close)) => {
                        let reason = close.map(|c| c.reason.to_string()).unwrap_or_default();
                        let _ = reader_events.send(SessionEvent::Closed(reason));
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = reader_events.send(SessionEvent::Error(e.to_string()));
                        return;
                    }
                }
            }
            let _ = reader_events.send(SessionEvent::Closed(String::new()));
        });

        let _ = event_tx.send(SessionEvent::Open);

        Ok(RealtimeConnection::from_parts(
            out_tx,
            event_rx,
            vec![writer, reader],
        ))
    }
}

/// Decode one wire payload and forward it as an event
fn forward_payload(bytes: &[u8], events: &mpsc::UnboundedSender<SessionEvent>) {
    match serde_json::from_slice::<ServerMessage>(bytes) {
        Ok(message) => {
            let _ = events.send(SessionEvent::Message(message));
        }
        Err(e) => {
            tracing::warn!(error = %e, len = bytes.len(), "undecodable server frame");
        }
    }
}
