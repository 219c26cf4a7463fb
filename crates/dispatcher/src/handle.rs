//! SinkHandle - a named sink: one destination, one dispatch pool

use contracts::{Bulk, BulkSubscriber};
use tracing::{debug, instrument};

use crate::error::DispatcherError;
use crate::metrics::WorkerStats;
use crate::output::{Destination, WriteLock};
use crate::pool::DispatchPool;
use crate::worker::WorkerReport;

/// Handle to a running sink.
///
/// Subscribed to the boundary detector; `update` only enqueues onto a worker
/// queue and never blocks on I/O.
pub struct SinkHandle {
    name: String,
    destination_label: String,
    pool: DispatchPool,
}

impl SinkHandle {
    /// Start `workers` threads that share `destination` and `write_lock`
    #[instrument(
        name = "sink_handle_spawn",
        skip(destination, write_lock),
        fields(dest = destination.label())
    )]
    pub fn spawn(
        name: &str,
        destination: Destination,
        workers: usize,
        write_lock: WriteLock,
    ) -> Result<Self, DispatcherError> {
        let mut pool = DispatchPool::new(name, write_lock);
        for _ in 0..workers {
            pool.add_worker(destination.clone())?;
        }
        debug!(sink = name, workers, "Sink started");

        Ok(Self {
            name: name.to_string(),
            destination_label: destination.label().to_string(),
            pool,
        })
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn destination_label(&self) -> &str {
        &self.destination_label
    }

    pub fn pool(&self) -> &DispatchPool {
        &self.pool
    }

    /// Signal the workers to stop after draining
    pub fn stop(&self) {
        self.pool.stop_all();
    }

    /// Wait for the workers to exit
    pub fn await_workers(&self) -> Vec<WorkerReport> {
        self.pool.await_all()
    }

    pub fn statistics(&self) -> Vec<WorkerStats> {
        self.pool.statistics()
    }
}

impl BulkSubscriber for SinkHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&self, bulk: &Bulk) {
        self.pool.dispatch(bulk);
    }
}
