//! Shared hub state.
//!
//! Everything the streaming handlers share lives here and is created once at
//! startup: the broadcast registry, the broadcast engine feeding it, the
//! shared tick producer and the metrics.

use std::sync::Arc;

use tracing::info;

use crate::config::HubConfig;
use crate::ws::broadcast::BroadcastEngine;
use crate::ws::feeds::TickGenerator;
use crate::ws::metrics::WsMetrics;
use crate::ws::producer::SharedProducer;
use crate::ws::registry::ConnectionRegistry;
use crate::ws::source::run_source;

/// State shared across all streaming connections.
#[derive(Debug, Clone)]
pub struct HubState {
    /// Hub configuration.
    pub config: Arc<HubConfig>,
    /// Connections on the tick channel.
    pub registry: Arc<ConnectionRegistry>,
    /// Fan-out over [`Self::registry`].
    pub broadcaster: BroadcastEngine,
    /// The single tick pipeline feeding the broadcaster.
    pub ticks: Arc<SharedProducer>,
    /// Metrics.
    pub metrics: Arc<WsMetrics>,
}

impl HubState {
    /// Creates the hub state. No producer runs until the first tick client connects.
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        let metrics = Arc::new(WsMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = BroadcastEngine::new(Arc::clone(&registry), Arc::clone(&metrics));

        let instruments = config.instruments.clone();
        let interval = config.tick_interval();
        let engine = broadcaster.clone();
        let ticks = Arc::new(SharedProducer::new("ticks", move || {
            run_source(TickGenerator::new(&instruments, interval), engine.clone())
        }));

        Self {
            config: Arc::new(config),
            registry,
            broadcaster,
            ticks,
            metrics,
        }
    }

    /// Stops the tick producer and empties the registry.
    pub fn shutdown(&self) {
        self.ticks.shutdown();
        let dropped = self.registry.clear();
        info!(dropped, "hub shut down");
    }
}

impl Default for HubState {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}
