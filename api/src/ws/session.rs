//! Per-connection session lifecycle.
//!
//! A [`Session`] owns everything one accepted socket acquired: its registry
//! entry, its lease on a shared producer, and any private producer task.
//! All of it is released in `Drop`, so cleanup runs on every exit path,
//! including panics and cancellation of the session future.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes};
use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::channels::Channel;
use super::connection::Connection;
use super::error::DeliveryError;
use super::messages::{echo_reply, ControlMessage, ServerEvent};
use super::metrics::WsMetrics;
use super::producer::ProducerLease;
use super::registry::ConnectionRegistry;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket accepted, nothing acquired yet.
    Accepting,
    /// Added to the broadcast registry.
    Registered,
    /// Receiving events from a producer.
    Streaming,
    /// Answering inbound messages.
    Echoing,
    /// Releasing resources.
    Closing,
    /// All resources released.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Accepting => "accepting",
            Self::Registered => "registered",
            Self::Streaming => "streaming",
            Self::Echoing => "echoing",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why a session's receive loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent a close frame.
    ClientClosed,
    /// The inbound stream ended without a close frame.
    StreamEnded,
    /// The transport reported an error.
    TransportError,
    /// A control message could not be parsed.
    MalformedMessage,
    /// The writer side went away while replying.
    OutboundClosed,
}

/// An inbound data frame.
enum Frame {
    Text(Utf8Bytes),
    Binary,
}

/// Lifecycle handler for one accepted connection.
pub struct Session {
    channel: Channel,
    connection: Connection,
    state: SessionState,
    metrics: Arc<WsMetrics>,
    registry: Option<Arc<ConnectionRegistry>>,
    lease: Option<ProducerLease>,
    producer_task: Option<JoinHandle<()>>,
    requested_symbols: Vec<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("channel", &self.channel)
            .field("connection_id", &self.connection.id())
            .field("state", &self.state)
            .finish()
    }
}

impl Session {
    /// Starts a session for a freshly accepted connection.
    #[must_use]
    pub fn accept(channel: Channel, connection: Connection, metrics: Arc<WsMetrics>) -> Self {
        metrics.record_connection_opened(channel);
        info!(
            connection_id = connection.id(),
            %channel,
            active = metrics.active_on(channel),
            "session opened"
        );

        Self {
            channel,
            connection,
            state: SessionState::Accepting,
            metrics,
            registry: None,
            lease: None,
            producer_task: None,
            requested_symbols: Vec::new(),
        }
    }

    /// Returns the session's connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the symbols from the most recent `subscribe` request.
    #[must_use]
    pub fn requested_symbols(&self) -> &[String] {
        &self.requested_symbols
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            connection_id = self.connection.id(),
            from = %self.state,
            to = %next,
            "session state change"
        );
        self.state = next;
    }

    /// Sends the `connected` acknowledgment for this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection's writer is already gone.
    pub async fn greet(&self) -> Result<(), DeliveryError> {
        self.connection
            .send_event(&ServerEvent::connected(self.channel.greeting()))
            .await
    }

    /// Adds the connection to the broadcast registry.
    pub fn register(&mut self, registry: Arc<ConnectionRegistry>) {
        debug_assert!(self.channel.is_broadcast());
        registry.add(self.connection.clone());
        self.registry = Some(registry);
        self.transition(SessionState::Registered);
    }

    /// Holds a lease on a shared producer for the lifetime of the session.
    pub fn attach_producer(&mut self, lease: ProducerLease) {
        self.lease = Some(lease);
        self.transition(SessionState::Streaming);
    }

    /// Spawns a producer task owned by this session alone.
    pub fn spawn_producer<F>(&mut self, pipeline: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.producer_task.replace(tokio::spawn(pipeline)) {
            previous.abort();
        }
        self.transition(SessionState::Streaming);
    }

    /// Applies a control message, returning the reply to send.
    pub fn handle_control(&mut self, message: ControlMessage) -> Option<ServerEvent> {
        match message {
            ControlMessage::Ping => Some(ServerEvent::pong()),
            ControlMessage::Subscribe { symbols } => {
                info!(
                    connection_id = self.connection.id(),
                    ?symbols,
                    "client subscribed"
                );
                self.metrics.record_subscription();
                self.requested_symbols = symbols
                    .as_array()
                    .map(|list| {
                        list.iter()
                            .filter_map(|s| s.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                Some(ServerEvent::subscribed(symbols))
            }
            ControlMessage::Unknown => {
                debug!(
                    connection_id = self.connection.id(),
                    "ignoring unknown control message"
                );
                None
            }
        }
    }

    /// Serves `ping` / `subscribe` until the client goes away.
    ///
    /// With `strict` set, a malformed message ends the session; otherwise it
    /// is logged and skipped.
    pub async fn run_control_loop<S>(&mut self, inbound: &mut S, strict: bool) -> SessionEnd
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        loop {
            let parsed = match self.next_frame(inbound).await {
                Ok(Frame::Text(text)) => serde_json::from_str::<ControlMessage>(text.as_str())
                    .map_err(|e| e.to_string()),
                Ok(Frame::Binary) => Err("binary frames are not supported".to_string()),
                Err(end) => return end,
            };

            match parsed {
                Ok(message) => {
                    let Some(reply) = self.handle_control(message) else {
                        continue;
                    };
                    if let Err(e) = self.connection.send_event(&reply).await {
                        debug!(connection_id = self.connection.id(), error = %e, "reply not delivered");
                        return SessionEnd::OutboundClosed;
                    }
                }
                Err(reason) => {
                    warn!(
                        connection_id = self.connection.id(),
                        %reason,
                        "malformed control message"
                    );
                    self.metrics.record_error();
                    if strict {
                        return SessionEnd::MalformedMessage;
                    }
                }
            }
        }
    }

    /// Answers every inbound text message with a labelled echo.
    pub async fn run_echo_loop<S>(&mut self, inbound: &mut S, strict: bool) -> SessionEnd
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        self.transition(SessionState::Echoing);

        loop {
            match self.next_frame(inbound).await {
                Ok(Frame::Text(text)) => {
                    if self
                        .connection
                        .send_text(echo_reply(text.as_str()))
                        .await
                        .is_err()
                    {
                        return SessionEnd::OutboundClosed;
                    }
                }
                Ok(Frame::Binary) => {
                    warn!(connection_id = self.connection.id(), "binary frame on echo channel");
                    self.metrics.record_error();
                    if strict {
                        return SessionEnd::MalformedMessage;
                    }
                }
                Err(end) => return end,
            }
        }
    }

    /// Discards inbound data until the client goes away.
    pub async fn run_until_closed<S>(&mut self, inbound: &mut S) -> SessionEnd
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        loop {
            match self.next_frame(inbound).await {
                Ok(_) => debug!(connection_id = self.connection.id(), "ignoring inbound frame"),
                Err(end) => return end,
            }
        }
    }

    /// Reads the next data frame, mapping terminal conditions to a [`SessionEnd`].
    async fn next_frame<S>(&self, inbound: &mut S) -> Result<Frame, SessionEnd>
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        loop {
            let message = match inbound.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    warn!(connection_id = self.connection.id(), error = %e, "websocket error");
                    self.metrics.record_error();
                    return Err(SessionEnd::TransportError);
                }
                None => return Err(SessionEnd::StreamEnded),
            };

            match message {
                Message::Text(text) => {
                    self.metrics.record_message_received();
                    return Ok(Frame::Text(text));
                }
                Message::Binary(_) => {
                    self.metrics.record_message_received();
                    return Ok(Frame::Binary);
                }
                Message::Close(_) => {
                    debug!(connection_id = self.connection.id(), "close requested");
                    return Err(SessionEnd::ClientClosed);
                }
                // Protocol keepalives are answered by the transport.
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.transition(SessionState::Closing);

        if let Some(registry) = self.registry.take() {
            registry.remove(self.connection.id());
        }
        if let Some(task) = self.producer_task.take() {
            task.abort();
        }
        drop(self.lease.take());

        self.metrics.record_connection_closed(self.channel);
        self.transition(SessionState::Closed);
        info!(
            connection_id = self.connection.id(),
            channel = %self.channel,
            active = self.metrics.active_on(self.channel),
            "session closed"
        );
    }
}
