//! AlgoStream API - real-time streaming hub.
//!
//! Serves persistent WebSocket channels that push live market ticks, order
//! updates and strategy P&L to many concurrent clients.
//!
//! # Components
//!
//! - [`config`]: Hub configuration
//! - [`state`]: Shared hub state
//! - [`server`]: HTTP server and routing
//! - [`ws`]: Connections, registry, broadcast, producers and sessions
//! - [`error`]: Server errors

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod ws;

pub use config::{ConfigError, HubConfig, Instrument};
pub use error::ApiError;
pub use server::{router, Server};
pub use state::HubState;
