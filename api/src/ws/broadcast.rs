//! Event fan-out to registered connections.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::error::DeliveryError;
use super::messages::ServerEvent;
use super::metrics::WsMetrics;
use super::registry::ConnectionRegistry;
use super::source::EventSink;

/// Delivers events to every connection in a registry.
///
/// Delivery failures are logged and counted but never remove the target;
/// deregistration belongs to the target's own session.
#[derive(Debug, Clone)]
pub struct BroadcastEngine {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<WsMetrics>,
}

impl BroadcastEngine {
    /// Creates a broadcast engine over a registry.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, metrics: Arc<WsMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Returns the registry this engine fans out to.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Sends an event to every currently registered connection.
    ///
    /// The event is serialized once and offered to each target without
    /// waiting. A target whose queue is full misses this event; nobody else
    /// is held up by it.
    pub fn broadcast(&self, event: &ServerEvent) {
        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                error!(event_type = event.kind(), error = %e, "failed to serialize event");
                self.metrics.record_error();
                return;
            }
        };

        let targets = self.registry.all();
        if targets.is_empty() {
            debug!(event_type = event.kind(), "no broadcast targets");
            return;
        }
        self.metrics.record_broadcast();

        let mut delivered = 0usize;
        for conn in &targets {
            match conn.try_send_text(json.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(connection_id = conn.id(), error = %e, "failed to deliver event");
                    self.metrics.record_delivery_failure();
                }
            }
        }

        debug!(
            event_type = event.kind(),
            recipients = targets.len(),
            delivered,
            "broadcast event"
        );
    }
}

impl EventSink for BroadcastEngine {
    async fn deliver(&self, event: ServerEvent) -> Result<(), DeliveryError> {
        self.broadcast(&event);
        Ok(())
    }
}
