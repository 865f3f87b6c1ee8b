//! Streaming channel definitions.

use std::fmt;

/// The streaming endpoints exposed by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Shared market tick broadcast.
    Ticks,

    /// Order update stream (echo placeholder).
    Orders,

    /// Private per-connection P&L push.
    Pnl,
}

impl Channel {
    /// Every channel, in routing order.
    pub const ALL: [Self; 3] = [Self::Ticks, Self::Orders, Self::Pnl];

    /// Returns the channel name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ticks => "ticks",
            Self::Orders => "orders",
            Self::Pnl => "pnl",
        }
    }

    /// Returns the HTTP route the channel is served on.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Ticks => "/ws/ticks",
            Self::Orders => "/ws/orders",
            Self::Pnl => "/ws/pnl",
        }
    }

    /// Returns the message sent in the `connected` acknowledgment.
    #[must_use]
    pub const fn greeting(&self) -> &'static str {
        match self {
            Self::Ticks => "Connected to market data stream",
            Self::Orders => "Connected to order update stream",
            Self::Pnl => "Connected to P&L stream",
        }
    }

    /// Returns true if events on this channel fan out through the registry.
    #[must_use]
    pub const fn is_broadcast(&self) -> bool {
        matches!(self, Self::Ticks)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
