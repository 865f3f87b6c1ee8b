//! WebSocket connection handles.
//!
//! A [`Connection`] is the outbound side of one accepted socket: a bounded
//! queue drained by that socket's writer task. Handles are cheap to clone so
//! the registry can hold one for fan-out while the session owns the original.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};

use super::error::DeliveryError;
use super::messages::ServerEvent;
use super::source::EventSink;

/// Global connection ID counter.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique connection ID.
#[must_use]
pub fn next_connection_id() -> u64 {
    CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Outbound handle for one WebSocket connection.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique connection ID.
    id: u64,

    /// Sender for outgoing text frames.
    sender: mpsc::Sender<String>,

    /// How long a send may wait on a full queue.
    send_timeout: Duration,
}

impl Connection {
    /// Creates a new connection with a fresh ID.
    #[must_use]
    pub fn new(sender: mpsc::Sender<String>, send_timeout: Duration) -> Self {
        Self {
            id: next_connection_id(),
            sender,
            send_timeout,
        }
    }

    /// Returns the connection ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns true once the writer side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Queues a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Closed`] if the writer is gone, or
    /// [`DeliveryError::Timeout`] if the queue stays full past the send timeout.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), DeliveryError> {
        self.sender
            .send_timeout(text.into(), self.send_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => DeliveryError::Timeout(self.send_timeout),
                SendTimeoutError::Closed(_) => DeliveryError::Closed,
            })
    }

    /// Queues a raw text frame without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Full`] if the queue has no room, dropping the
    /// frame, or [`DeliveryError::Closed`] if the writer is gone.
    pub fn try_send_text(&self, text: impl Into<String>) -> Result<(), DeliveryError> {
        self.sender.try_send(text.into()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Serializes and queues an event.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the frame cannot be queued.
    pub async fn send_event(&self, event: &ServerEvent) -> Result<(), DeliveryError> {
        let json = serde_json::to_string(event)?;
        self.send_text(json).await
    }
}

impl EventSink for Connection {
    async fn deliver(&self, event: ServerEvent) -> Result<(), DeliveryError> {
        self.send_event(&event).await
    }
}
