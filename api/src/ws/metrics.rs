//! Hub metrics.
//!
//! Lock-free counters shared by every session, the writers and the
//! broadcast engine. Connection counts are kept per [`Channel`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::channels::Channel;

/// A monotonically increasing counter.
#[derive(Debug, Default)]
struct Counter(AtomicU64);

impl Counter {
    fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Opened/closed pair for one channel.
#[derive(Debug, Default)]
struct ConnectionCounts {
    opened: Counter,
    closed: Counter,
}

impl ConnectionCounts {
    fn active(&self) -> u64 {
        self.opened.get().saturating_sub(self.closed.get())
    }
}

/// Metrics for the streaming hub.
#[derive(Debug)]
pub struct WsMetrics {
    ticks: ConnectionCounts,
    orders: ConnectionCounts,
    pnl: ConnectionCounts,

    /// Inbound data frames.
    messages_received: Counter,
    /// Frames written to sockets.
    messages_sent: Counter,
    /// Transport errors, malformed messages and serialization failures.
    errors: Counter,
    /// Subscribe requests.
    subscriptions: Counter,
    /// Broadcasts with at least one target.
    broadcasts: Counter,
    /// Per-target delivery failures during broadcast.
    delivery_failures: Counter,

    started: Instant,
}

impl Default for WsMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl WsMetrics {
    /// Creates zeroed metrics.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ticks: ConnectionCounts::default(),
            orders: ConnectionCounts::default(),
            pnl: ConnectionCounts::default(),
            messages_received: Counter::default(),
            messages_sent: Counter::default(),
            errors: Counter::default(),
            subscriptions: Counter::default(),
            broadcasts: Counter::default(),
            delivery_failures: Counter::default(),
            started: Instant::now(),
        }
    }

    const fn channel(&self, channel: Channel) -> &ConnectionCounts {
        match channel {
            Channel::Ticks => &self.ticks,
            Channel::Orders => &self.orders,
            Channel::Pnl => &self.pnl,
        }
    }

    /// Records a session opened on `channel`.
    pub fn record_connection_opened(&self, channel: Channel) {
        self.channel(channel).opened.incr();
    }

    /// Records a session closed on `channel`.
    pub fn record_connection_closed(&self, channel: Channel) {
        self.channel(channel).closed.incr();
    }

    /// Records an inbound data frame.
    pub fn record_message_received(&self) {
        self.messages_received.incr();
    }

    /// Records a frame written to a socket.
    pub fn record_message_sent(&self) {
        self.messages_sent.incr();
    }

    /// Records an error.
    pub fn record_error(&self) {
        self.errors.incr();
    }

    /// Records a subscribe request.
    pub fn record_subscription(&self) {
        self.subscriptions.incr();
    }

    /// Records a broadcast with at least one target.
    pub fn record_broadcast(&self) {
        self.broadcasts.incr();
    }

    /// Records a failed delivery to one broadcast target.
    pub fn record_delivery_failure(&self) {
        self.delivery_failures.incr();
    }

    /// Returns the sessions ever opened, across channels.
    #[must_use]
    pub fn connections_opened(&self) -> u64 {
        Channel::ALL
            .iter()
            .map(|c| self.channel(*c).opened.get())
            .sum()
    }

    /// Returns the sessions closed, across channels.
    #[must_use]
    pub fn connections_closed(&self) -> u64 {
        Channel::ALL
            .iter()
            .map(|c| self.channel(*c).closed.get())
            .sum()
    }

    /// Returns the sessions currently open, across channels.
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        Channel::ALL.iter().map(|c| self.active_on(*c)).sum()
    }

    /// Returns the sessions currently open on `channel`.
    #[must_use]
    pub fn active_on(&self, channel: Channel) -> u64 {
        self.channel(channel).active()
    }

    /// Returns the total inbound data frames.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.messages_received.get()
    }

    /// Returns the total frames written to sockets.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.get()
    }

    /// Returns the total errors.
    #[must_use]
    pub fn errors(&self) -> u64 {
        self.errors.get()
    }

    /// Returns the total subscribe requests.
    #[must_use]
    pub fn subscriptions(&self) -> u64 {
        self.subscriptions.get()
    }

    /// Returns the total broadcasts.
    #[must_use]
    pub fn broadcasts(&self) -> u64 {
        self.broadcasts.get()
    }

    /// Returns the total delivery failures.
    #[must_use]
    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.get()
    }

    /// Returns the time since the metrics were created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns a point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> WsMetricsSnapshot {
        WsMetricsSnapshot {
            active_ticks: self.active_on(Channel::Ticks),
            active_orders: self.active_on(Channel::Orders),
            active_pnl: self.active_on(Channel::Pnl),
            connections_opened: self.connections_opened(),
            messages_received: self.messages_received(),
            messages_sent: self.messages_sent(),
            errors: self.errors(),
            subscriptions: self.subscriptions(),
            broadcasts: self.broadcasts(),
            delivery_failures: self.delivery_failures(),
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

/// A point-in-time copy of [`WsMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WsMetricsSnapshot {
    /// Open tick sessions.
    pub active_ticks: u64,
    /// Open order sessions.
    pub active_orders: u64,
    /// Open P&L sessions.
    pub active_pnl: u64,
    /// Sessions ever opened.
    pub connections_opened: u64,
    /// Inbound data frames.
    pub messages_received: u64,
    /// Frames written to sockets.
    pub messages_sent: u64,
    /// Errors.
    pub errors: u64,
    /// Subscribe requests.
    pub subscriptions: u64,
    /// Broadcasts with at least one target.
    pub broadcasts: u64,
    /// Failed broadcast deliveries.
    pub delivery_failures: u64,
    /// Seconds since startup.
    pub uptime_secs: u64,
}
