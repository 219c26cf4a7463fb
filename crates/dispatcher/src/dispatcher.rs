//! Dispatcher - the set of sinks a run fans out to

use std::sync::Arc;
use tracing::{debug, info, instrument};

use contracts::{BulkSubscriber, SinkConfig};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::WorkerStats;
use crate::output::WriteLock;
use crate::sinks::open_destination;
use crate::worker::WorkerReport;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    write_lock: WriteLock,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder with a fresh write lock
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            write_lock: WriteLock::new(),
        }
    }

    /// Share an existing write lock with other writers of the same streams
    pub fn with_write_lock(mut self, write_lock: WriteLock) -> Self {
        self.write_lock = write_lock;
        self
    }

    /// Open every destination and start every worker.
    ///
    /// Sinks already started are stopped again if a later one fails.
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(sink_count = self.config.sinks.len())
    )]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut handles = Vec::with_capacity(self.config.sinks.len());
        for sink_config in &self.config.sinks {
            match create_sink_handle(sink_config, &self.write_lock) {
                Ok(handle) => handles.push(Arc::new(handle)),
                Err(e) => {
                    let partial = Dispatcher::with_handles(handles, self.write_lock);
                    partial.shutdown();
                    return Err(e);
                }
            }
        }

        Ok(Dispatcher::with_handles(handles, self.write_lock))
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config, write_lock),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(
    config: &SinkConfig,
    write_lock: &WriteLock,
) -> Result<SinkHandle, DispatcherError> {
    let destination = open_destination(config)
        .map_err(|e| DispatcherError::sink_creation(&config.name, e))?;
    SinkHandle::spawn(&config.name, destination, config.workers, write_lock.clone())
}

/// The running sinks of one pipeline
pub struct Dispatcher {
    handles: Vec<Arc<SinkHandle>>,
    write_lock: WriteLock,
}

impl Dispatcher {
    /// Create a dispatcher from ready-made sink handles (for testing)
    pub fn with_handles(handles: Vec<Arc<SinkHandle>>, write_lock: WriteLock) -> Self {
        Self {
            handles,
            write_lock,
        }
    }

    /// Sinks as detector subscribers, in configuration order
    pub fn subscribers(&self) -> Vec<Arc<dyn BulkSubscriber>> {
        self.handles
            .iter()
            .map(|h| Arc::clone(h) as Arc<dyn BulkSubscriber>)
            .collect()
    }

    pub fn handles(&self) -> &[Arc<SinkHandle>] {
        &self.handles
    }

    pub fn write_lock(&self) -> &WriteLock {
        &self.write_lock
    }

    /// Per sink, per worker statistics
    pub fn statistics(&self) -> Vec<(String, Vec<WorkerStats>)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.statistics()))
            .collect()
    }

    /// Signal every worker of every sink to stop after draining
    pub fn stop_all(&self) {
        debug!(sinks = self.handles.len(), "Stopping all sinks");
        for handle in &self.handles {
            handle.stop();
        }
    }

    /// Wait for every worker of every sink; reports in sink then pool order
    #[instrument(name = "dispatcher_await_all", skip(self))]
    pub fn await_all(&self) -> Vec<WorkerReport> {
        self.handles
            .iter()
            .flat_map(|h| h.await_workers())
            .collect()
    }

    /// `stop_all` followed by `await_all`
    pub fn shutdown(&self) -> Vec<WorkerReport> {
        self.stop_all();
        let reports = self.await_all();
        info!(workers = reports.len(), "Dispatcher shutdown complete");
        reports
    }
}

/// Convenience function to create a dispatcher from sink configs
pub fn create_dispatcher(sink_configs: Vec<SinkConfig>) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config).build()
}
