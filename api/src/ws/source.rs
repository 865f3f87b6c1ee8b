//! Event sources and sinks.
//!
//! An [`EventSource`] produces batches of events at a fixed cadence and an
//! [`EventSink`] accepts them. [`run_source`] wires one to the other until
//! the sink reports it is gone or the owning task is aborted. A real market
//! feed plugs in by implementing [`EventSource`].

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::DeliveryError;
use super::messages::ServerEvent;

/// A producer of domain events.
pub trait EventSource: Send + 'static {
    /// Produces the events for one cycle, in emission order.
    fn next_batch(&mut self) -> Vec<ServerEvent>;

    /// Returns the pause between cycles.
    fn interval(&self) -> Duration;
}

/// A consumer of domain events.
pub trait EventSink: Send + Sync + 'static {
    /// Delivers one event.
    ///
    /// [`DeliveryError::Closed`] means the sink will never accept another
    /// event. Any other error loses only this event.
    fn deliver(
        &self,
        event: ServerEvent,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Runs a source into a sink.
///
/// Each cycle hands every event of the batch to the sink immediately, in
/// order, then sleeps for the source's interval. Events the sink cannot take
/// right now are dropped. Returns when the sink is closed; otherwise runs
/// until the surrounding task is aborted.
pub async fn run_source<S, K>(mut source: S, sink: K)
where
    S: EventSource,
    K: EventSink,
{
    let interval = source.interval();

    loop {
        for event in source.next_batch() {
            match sink.deliver(event).await {
                Ok(()) => {}
                Err(e) if e.is_closed() => {
                    debug!("event sink closed, stopping source");
                    return;
                }
                Err(e) => warn!(error = %e, "event dropped"),
            }
        }

        tokio::time::sleep(interval).await;
    }
}
