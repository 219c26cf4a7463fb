//! Worker - one thread draining one pending-bulk queue into a destination

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use contracts::{Bulk, ContractError};
use tracing::{debug, error, trace};

use crate::error::DispatcherError;
use crate::metrics::{WorkerMetrics, WorkerStats};
use crate::output::{Destination, WriteLock};

/// Worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, loop not entered yet
    Idle,
    /// Waiting for or writing bulks
    Running,
    /// Stop requested, still emptying the queue
    Draining,
    /// Stop requested and queue empty; thread exited
    Stopped,
    /// A write failed; thread exited
    Failed,
}

impl WorkerState {
    /// Whether the worker can still take new bulks
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything guarded by the worker's mutex
struct WorkerQueue {
    pending: VecDeque<Bulk>,
    /// Assignments so far; never decremented on completion
    load: u64,
    stop_requested: bool,
    state: WorkerState,
}

struct WorkerShared {
    queue: Mutex<WorkerQueue>,
    ready: Condvar,
    metrics: WorkerMetrics,
}

impl WorkerShared {
    fn lock(&self) -> MutexGuard<'_, WorkerQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Final account of a worker, returned when its thread is joined
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub worker_id: String,
    pub sink: String,
    pub stats: WorkerStats,
    pub state: WorkerState,
    /// Bulks still queued when the worker failed
    pub abandoned: usize,
    pub failure: Option<String>,
}

impl WorkerReport {
    pub fn is_failed(&self) -> bool {
        self.state == WorkerState::Failed
    }
}

/// Pool-side handle to a running worker thread
pub struct Worker {
    id: String,
    shared: Arc<WorkerShared>,
}

impl Worker {
    /// Start a worker thread named after `id`.
    pub(crate) fn spawn(
        id: String,
        sink: String,
        destination: Destination,
        write_lock: WriteLock,
    ) -> Result<(Self, JoinHandle<WorkerReport>), DispatcherError> {
        let shared = Arc::new(WorkerShared {
            queue: Mutex::new(WorkerQueue {
                pending: VecDeque::new(),
                load: 0,
                stop_requested: false,
                state: WorkerState::Idle,
            }),
            ready: Condvar::new(),
            metrics: WorkerMetrics::new(),
        });

        let context = WorkerContext {
            id: id.clone(),
            sink,
            shared: Arc::clone(&shared),
            destination,
            write_lock,
        };

        let join = thread::Builder::new()
            .name(id.clone())
            .spawn(move || context.run())
            .map_err(|source| DispatcherError::WorkerSpawn {
                worker_id: id.clone(),
                source,
            })?;

        Ok((Self { id, shared }, join))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Assignments so far
    pub fn load(&self) -> u64 {
        self.shared.lock().load
    }

    pub fn state(&self) -> WorkerState {
        self.shared.lock().state
    }

    /// Bulks waiting in the queue
    pub fn queued(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn stats(&self) -> WorkerStats {
        self.shared.metrics.snapshot()
    }

    /// `(load, live)` read under one lock acquisition
    pub(crate) fn load_and_liveness(&self) -> (u64, bool) {
        let queue = self.shared.lock();
        (queue.load, queue.state.is_live())
    }

    /// Enqueue a bulk and bump the load.
    ///
    /// Hands the bulk back if the worker already terminated.
    pub(crate) fn assign(&self, bulk: Bulk) -> Result<u64, Bulk> {
        let mut queue = self.shared.lock();
        if !queue.state.is_live() {
            return Err(bulk);
        }
        queue.pending.push_back(bulk);
        queue.load += 1;
        let load = queue.load;
        drop(queue);
        self.shared.ready.notify_one();
        Ok(load)
    }

    /// Ask the worker to exit once its queue is empty
    pub(crate) fn request_stop(&self) {
        let mut queue = self.shared.lock();
        queue.stop_requested = true;
        if queue.state == WorkerState::Running && !queue.pending.is_empty() {
            queue.state = WorkerState::Draining;
        }
        drop(queue);
        self.shared.ready.notify_one();
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.shared.lock();
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("state", &queue.state)
            .field("load", &queue.load)
            .field("queued", &queue.pending.len())
            .finish()
    }
}

/// State moved into the worker thread
struct WorkerContext {
    id: String,
    sink: String,
    shared: Arc<WorkerShared>,
    destination: Destination,
    write_lock: WriteLock,
}

impl WorkerContext {
    fn run(self) -> WorkerReport {
        self.set_running();
        debug!(
            worker = %self.id,
            sink = %self.sink,
            dest = self.destination.label(),
            "Worker started"
        );

        let mut failure = None;
        while let Some(bulk) = self.next_bulk() {
            match self.write_lock.write_line(&self.destination, bulk.as_str()) {
                Ok(()) => {
                    self.shared.metrics.record_written(&bulk);
                    observability::record_bulk_written(&self.sink, &self.id, true);
                    trace!(worker = %self.id, commands = bulk.len(), "Bulk written");
                }
                Err(e) => {
                    let err = ContractError::sink_write(&self.sink, e.to_string());
                    self.shared.metrics.inc_failure_count();
                    observability::record_bulk_written(&self.sink, &self.id, false);
                    error!(worker = %self.id, error = %err, "Write failed, worker stopping");
                    failure = Some(err.to_string());
                    break;
                }
            }
        }

        if failure.is_none() {
            if let Err(e) = self.write_lock.flush(&self.destination) {
                let err = ContractError::sink_write(&self.sink, e.to_string());
                error!(worker = %self.id, error = %err, "Flush failed on shutdown");
                failure = Some(err.to_string());
            }
        }

        self.finish(failure)
    }

    fn set_running(&self) {
        let mut queue = self.shared.lock();
        if queue.state == WorkerState::Idle {
            queue.state = WorkerState::Running;
        }
    }

    /// Block until a bulk is available, or return `None` once stop was
    /// requested and the queue is empty.
    fn next_bulk(&self) -> Option<Bulk> {
        let mut queue = self.shared.lock();
        loop {
            if let Some(bulk) = queue.pending.pop_front() {
                if queue.stop_requested {
                    queue.state = WorkerState::Draining;
                }
                return Some(bulk);
            }
            if queue.stop_requested {
                return None;
            }
            queue = self
                .shared
                .ready
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn finish(self, failure: Option<String>) -> WorkerReport {
        let (state, abandoned) = {
            let mut queue = self.shared.lock();
            queue.state = if failure.is_some() {
                WorkerState::Failed
            } else {
                WorkerState::Stopped
            };
            let abandoned = queue.pending.len();
            queue.pending.clear();
            (queue.state, abandoned)
        };

        let stats = self.shared.metrics.snapshot();
        debug!(
            worker = %self.id,
            sink = %self.sink,
            state = %state,
            bulks = stats.bulks_processed,
            commands = stats.commands_processed,
            "Worker stopped"
        );

        WorkerReport {
            worker_id: self.id,
            sink: self.sink,
            stats,
            state,
            abandoned,
            failure,
        }
    }
}
