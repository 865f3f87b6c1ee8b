//! WebSocket module for real-time streaming.
//!
//! # Channels
//!
//! - `/ws/ticks` - Market ticks, one shared feed broadcast to every client
//! - `/ws/orders` - Order updates (currently echoes inbound messages)
//! - `/ws/pnl` - Strategy P&L, a private feed per connection
//!
//! # Message Types
//!
//! - `ping` / `subscribe` - Client control messages on the tick channel
//! - `connected` - Acknowledgment sent on accept
//! - `tick` / `order` / `pnl` - Domain events
//! - `pong` / `subscribed` - Control replies

pub mod broadcast;
pub mod channels;
pub mod connection;
pub mod error;
pub mod feeds;
pub mod handler;
pub mod messages;
pub mod metrics;
pub mod producer;
pub mod registry;
pub mod session;
pub mod source;

pub use broadcast::BroadcastEngine;
pub use channels::Channel;
pub use connection::Connection;
pub use error::DeliveryError;
pub use feeds::{PnlGenerator, TickGenerator};
pub use handler::{orders_handler, pnl_handler, ticks_handler};
pub use messages::{ControlMessage, ServerEvent};
pub use metrics::WsMetrics;
pub use producer::{ProducerLease, SharedProducer};
pub use registry::ConnectionRegistry;
pub use session::{Session, SessionEnd, SessionState};
pub use source::{run_source, EventSink, EventSource};
