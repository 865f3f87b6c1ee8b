//! WebSocket message types.
//!
//! Defines the event format pushed to clients and the control messages
//! clients may send on the tick channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix applied to every reply on the order echo channel.
pub const ECHO_PREFIX: &str = "Received: ";

/// Builds the plain-text reply for an inbound order channel message.
#[must_use]
pub fn echo_reply(text: &str) -> String {
    format!("{ECHO_PREFIX}{text}")
}

/// Message sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Keepalive request, answered with a `pong`.
    Ping,

    /// Declares interest in a set of symbols.
    ///
    /// The request is acknowledged but does not filter broadcast delivery.
    /// `symbols` is kept as sent so the acknowledgment echoes it verbatim.
    Subscribe {
        /// Requested symbols; an empty array when absent.
        #[serde(default = "no_symbols")]
        symbols: Value,
    },

    /// Any other well-formed message type.
    #[serde(other)]
    Unknown,
}

fn no_symbols() -> Value {
    Value::Array(Vec::new())
}

/// Event sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Connection acknowledgment.
    Connected {
        /// Human-readable greeting.
        message: String,
        /// Generation time.
        timestamp: DateTime<Utc>,
    },

    /// Market price tick.
    Tick {
        /// Tick body.
        data: Tick,
    },

    /// Order status update.
    Order {
        /// Order body.
        data: OrderUpdate,
    },

    /// Strategy P&L snapshot.
    Pnl {
        /// P&L body.
        data: PnlUpdate,
    },

    /// Subscription acknowledgment.
    Subscribed {
        /// Symbols echoed back from the request.
        symbols: Value,
        /// Generation time.
        timestamp: DateTime<Utc>,
    },

    /// Reply to a `ping`.
    Pong {
        /// Generation time.
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    /// Creates a connection acknowledgment.
    #[must_use]
    pub fn connected(message: impl Into<String>) -> Self {
        Self::Connected {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a subscription acknowledgment.
    #[must_use]
    pub fn subscribed(symbols: impl Into<Value>) -> Self {
        Self::Subscribed {
            symbols: symbols.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a pong with a fresh timestamp.
    #[must_use]
    pub fn pong() -> Self {
        Self::Pong {
            timestamp: Utc::now(),
        }
    }

    /// Returns the wire discriminant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Tick { .. } => "tick",
            Self::Order { .. } => "order",
            Self::Pnl { .. } => "pnl",
            Self::Subscribed { .. } => "subscribed",
            Self::Pong { .. } => "pong",
        }
    }

    /// Returns the generation timestamp.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Connected { timestamp, .. }
            | Self::Subscribed { timestamp, .. }
            | Self::Pong { timestamp } => *timestamp,
            Self::Tick { data } => data.timestamp,
            Self::Order { data } => data.timestamp,
            Self::Pnl { data } => data.timestamp,
        }
    }
}

/// A single price tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    /// Instrument symbol.
    pub symbol: String,
    /// Last traded price.
    pub ltp: f64,
    /// Absolute change from the previous price.
    pub change: f64,
    /// Change relative to the previous price, in percent.
    pub change_percent: f64,
    /// Traded volume.
    pub volume: u64,
    /// Generation time.
    pub timestamp: DateTime<Utc>,
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Accepted, awaiting execution.
    Open,
    /// Fully executed.
    Complete,
    /// Cancelled before completion.
    Cancelled,
    /// Rejected by the broker.
    Rejected,
}

/// An order status update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    /// Broker order id.
    pub order_id: String,
    /// Owning strategy id.
    pub strategy_id: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Order side.
    pub side: OrderSide,
    /// Order quantity.
    pub quantity: u32,
    /// Limit or fill price.
    pub price: f64,
    /// Current status.
    pub status: OrderStatus,
    /// Generation time.
    pub timestamp: DateTime<Utc>,
}

/// A strategy P&L snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlUpdate {
    /// Strategy id.
    #[serde(rename = "strategyId")]
    pub strategy_id: String,
    /// P&L of currently open positions.
    #[serde(rename = "currentPnL")]
    pub current_pnl: f64,
    /// Cumulative P&L.
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
    /// Number of open positions.
    #[serde(rename = "openPositions")]
    pub open_positions: u32,
    /// Generation time.
    pub timestamp: DateTime<Utc>,
}
