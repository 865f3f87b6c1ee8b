//! WebSocket delivery errors.

use std::time::Duration;

/// Failure to hand an outbound frame to a connection.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The connection's writer has gone away.
    #[error("connection closed")]
    Closed,

    /// The connection's outbound queue was full and the frame was dropped.
    #[error("outbound queue full")]
    Full,

    /// The connection's outbound queue stayed full for too long.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    /// The event could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DeliveryError {
    /// Returns true if the connection will never accept another frame.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
