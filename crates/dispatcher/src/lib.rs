//! # Dispatcher
//!
//! Sink side of the pipeline.
//!
//! - Each sink owns a `DispatchPool` of worker threads sharing one destination
//! - Bulks go to the least-loaded live worker of every sink
//! - A shared `WriteLock` keeps lines whole across all workers
//! - `stop_all` + `await_all` drain every queue before returning

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod output;
pub mod pool;
pub mod sinks;
pub mod worker;

pub use contracts::{Bulk, BulkSubscriber};
pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherConfig, create_dispatcher};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{WorkerMetrics, WorkerStats};
pub use output::{Destination, MemoryBuffer, WriteLock};
pub use pool::DispatchPool;
pub use sinks::{FileSinkConfig, open_destination};
pub use worker::{Worker, WorkerReport, WorkerState};
