//! Reference-counted shared producer.
//!
//! A broadcast channel needs exactly one pipeline feeding its registry no
//! matter how many clients are connected. Sessions take a [`ProducerLease`];
//! the first lease starts the pipeline task and dropping the last one aborts
//! it.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::info;

type PipelineFactory = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Default)]
struct ProducerState {
    leases: usize,
    /// Bumped by `shutdown`; leases from an earlier epoch release nothing.
    epoch: u64,
    task: Option<JoinHandle<()>>,
}

/// A pipeline started on first use and stopped when no longer needed.
pub struct SharedProducer {
    name: &'static str,
    factory: PipelineFactory,
    state: Mutex<ProducerState>,
}

impl fmt::Debug for SharedProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedProducer")
            .field("name", &self.name)
            .field("leases", &self.lease_count())
            .field("running", &self.is_running())
            .finish()
    }
}

impl SharedProducer {
    /// Creates a stopped producer.
    ///
    /// `factory` builds a fresh pipeline future each time the producer
    /// starts, so restarted pipelines never share state with earlier runs.
    #[must_use]
    pub fn new<F, Fut>(name: &'static str, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name,
            factory: Box::new(move || factory().boxed()),
            state: Mutex::new(ProducerState::default()),
        }
    }

    /// Takes a lease, starting the pipeline if it is not running.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn acquire(self: &Arc<Self>) -> ProducerLease {
        let mut state = self.lock();
        state.leases += 1;

        let running = matches!(&state.task, Some(task) if !task.is_finished());
        if !running {
            state.task = Some(tokio::spawn((self.factory)()));
            info!(producer = self.name, "producer started");
        }

        ProducerLease {
            producer: Arc::clone(self),
            epoch: state.epoch,
        }
    }

    fn release(&self, epoch: u64) {
        let mut state = self.lock();
        if state.epoch != epoch {
            return;
        }
        state.leases = state.leases.saturating_sub(1);

        if state.leases == 0 {
            if let Some(task) = state.task.take() {
                task.abort();
                info!(producer = self.name, "producer stopped");
            }
        }
    }

    /// Stops the pipeline regardless of outstanding leases.
    ///
    /// Leases taken before the call no longer count; dropping them later
    /// cannot stop a pipeline started by a newer lease.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.leases = 0;
        state.epoch += 1;
        if let Some(task) = state.task.take() {
            task.abort();
            info!(producer = self.name, "producer shut down");
        }
    }

    /// Returns the number of outstanding leases.
    #[must_use]
    pub fn lease_count(&self) -> usize {
        self.lock().leases
    }

    /// Returns true if the pipeline task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(&self.lock().task, Some(task) if !task.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, ProducerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A claim on a [`SharedProducer`]; released on drop.
#[must_use = "dropping the lease releases the producer immediately"]
pub struct ProducerLease {
    producer: Arc<SharedProducer>,
    epoch: u64,
}

impl fmt::Debug for ProducerLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerLease")
            .field("producer", &self.producer.name)
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl Drop for ProducerLease {
    fn drop(&mut self) {
        self.producer.release(self.epoch);
    }
}
