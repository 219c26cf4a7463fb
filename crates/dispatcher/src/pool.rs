//! DispatchPool - a sink's fixed set of workers with least-loaded assignment

use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;

use contracts::Bulk;
use tracing::{debug, error, instrument, trace, warn};

use crate::error::DispatcherError;
use crate::metrics::WorkerStats;
use crate::output::{Destination, WriteLock};
use crate::worker::{Worker, WorkerReport, WorkerState};

/// Worker pool owned by one sink.
///
/// Load balancing picks the live worker with the smallest load counter; ties
/// go to the earliest worker. The counter counts assignments and is never
/// decremented, so it approximates assignment pressure rather than backlog.
/// Bulks routed to different workers carry no relative ordering guarantee.
pub struct DispatchPool {
    sink: String,
    write_lock: WriteLock,
    workers: Vec<Worker>,
    /// Join handles of the worker threads, taken by `await_all`
    handles: Mutex<Vec<JoinHandle<WorkerReport>>>,
}

impl DispatchPool {
    pub fn new(sink: impl Into<String>, write_lock: WriteLock) -> Self {
        Self {
            sink: sink.into(),
            write_lock,
            workers: Vec::new(),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Create and start a worker writing to `destination`.
    ///
    /// Worker ids are `<sink>-<index>`.
    #[instrument(name = "pool_add_worker", skip(self, destination), fields(sink = %self.sink))]
    pub fn add_worker(&mut self, destination: Destination) -> Result<&Worker, DispatcherError> {
        let id = format!("{}-{}", self.sink, self.workers.len());
        let (worker, handle) = Worker::spawn(
            id,
            self.sink.clone(),
            destination,
            self.write_lock.clone(),
        )?;

        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
        self.workers.push(worker);
        debug!(worker = self.workers.len() - 1, "Worker added");
        Ok(&self.workers[self.workers.len() - 1])
    }

    /// Hand a bulk to the least-loaded live worker.
    ///
    /// Returns the index of the chosen worker; `None` when the pool is empty or
    /// every worker has terminated (the bulk is dropped).
    pub fn dispatch(&self, bulk: &Bulk) -> Option<usize> {
        if self.workers.is_empty() {
            trace!(sink = %self.sink, "Dispatch on empty pool ignored");
            return None;
        }

        let mut excluded = vec![false; self.workers.len()];
        let mut bulk = bulk.clone();
        loop {
            let Some(idx) = self.least_loaded(&excluded) else {
                warn!(sink = %self.sink, "No live worker left, bulk dropped");
                observability::record_bulk_dropped(&self.sink);
                return None;
            };

            let worker = &self.workers[idx];
            match worker.assign(bulk) {
                Ok(load) => {
                    observability::record_bulk_dispatched(&self.sink, worker.id(), load);
                    trace!(sink = %self.sink, worker = worker.id(), load, "Bulk dispatched");
                    return Some(idx);
                }
                Err(returned) => {
                    // Terminated between the scan and the assignment
                    excluded[idx] = true;
                    bulk = returned;
                }
            }
        }
    }

    fn least_loaded(&self, excluded: &[bool]) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (idx, worker) in self.workers.iter().enumerate() {
            if excluded[idx] {
                continue;
            }
            let (load, live) = worker.load_and_liveness();
            if !live {
                continue;
            }
            // Strict `<` keeps the earliest worker on ties
            if best.is_none_or(|(_, best_load)| load < best_load) {
                best = Some((idx, load));
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Signal every worker to stop once its queue is drained
    pub fn stop_all(&self) {
        debug!(sink = %self.sink, workers = self.workers.len(), "Stopping workers");
        for worker in &self.workers {
            worker.request_stop();
        }
    }

    /// Block until every worker thread has exited.
    ///
    /// Call after `stop_all`; otherwise this waits for workers that are never
    /// told to stop. A second call returns an empty list.
    #[instrument(name = "pool_await_all", skip(self), fields(sink = %self.sink))]
    pub fn await_all(&self) -> Vec<WorkerReport> {
        let handles = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
        );

        handles
            .into_iter()
            .zip(&self.workers)
            .map(|(handle, worker)| {
                handle.join().unwrap_or_else(|_| {
                    error!(worker = worker.id(), "Worker thread panicked");
                    WorkerReport {
                        worker_id: worker.id().to_string(),
                        sink: self.sink.clone(),
                        stats: worker.stats(),
                        state: WorkerState::Failed,
                        abandoned: worker.queued(),
                        failure: Some("worker thread panicked".to_string()),
                    }
                })
            })
            .collect()
    }

    /// Per worker `(bulks_processed, commands_processed)`, in pool order
    pub fn statistics(&self) -> Vec<WorkerStats> {
        self.workers.iter().map(Worker::stats).collect()
    }

    /// Current load counters, in pool order
    pub fn load_counts(&self) -> Vec<u64> {
        self.workers.iter().map(Worker::load).collect()
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn sink(&self) -> &str {
        &self.sink
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl Drop for DispatchPool {
    /// Let detached worker threads exit instead of waiting forever.
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.request_stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemoryBuffer;
    use contracts::Command;
    use std::io::{self, Write};

    fn bulk(items: &[&str]) -> Bulk {
        let cmds: Vec<Command> = items.iter().map(|s| Command::from(*s)).collect();
        Bulk::render(&cmds).unwrap()
    }

    fn memory_pool(workers: usize) -> (DispatchPool, MemoryBuffer) {
        let (dest, buffer) = Destination::memory("mem");
        let mut pool = DispatchPool::new("mem", WriteLock::new());
        for _ in 0..workers {
            pool.add_worker(dest.clone()).unwrap();
        }
        (pool, buffer)
    }

    struct DiskFull;

    impl Write for DiskFull {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_ties_go_to_pool_order() {
        let (pool, _buffer) = memory_pool(3);
        assert_eq!(pool.dispatch(&bulk(&["a"])), Some(0));
        assert_eq!(pool.dispatch(&bulk(&["b"])), Some(1));
        assert_eq!(pool.dispatch(&bulk(&["c"])), Some(2));
        pool.stop_all();
        pool.await_all();
    }

    #[test]
    fn test_load_reflects_assignments_not_completions() {
        let (pool, buffer) = memory_pool(3);
        for c in ["a", "b", "c"] {
            pool.dispatch(&bulk(&[c]));
        }

        // Wait until everything assigned so far has been written
        while buffer.lines().len() < 3 {
            std::thread::yield_now();
        }
        assert_eq!(pool.load_counts(), vec![1, 1, 1]);

        // Completed work does not lower the counters: worker 0 wins the tie again
        assert_eq!(pool.dispatch(&bulk(&["d"])), Some(0));
        assert_eq!(pool.load_counts(), vec![2, 1, 1]);
        assert_eq!(pool.dispatch(&bulk(&["e"])), Some(1));

        pool.stop_all();
        pool.await_all();
        assert_eq!(pool.load_counts(), vec![2, 2, 1]);
    }

    #[test]
    fn test_empty_pool_is_noop() {
        let pool = DispatchPool::new("empty", WriteLock::new());
        assert!(pool.is_empty());
        assert_eq!(pool.dispatch(&bulk(&["a"])), None);
        pool.stop_all();
        assert!(pool.await_all().is_empty());
    }

    #[test]
    fn test_stop_and_await_write_everything_once() {
        let (pool, buffer) = memory_pool(4);
        let sent: Vec<String> = (0..100).map(|i| format!("cmd{i}")).collect();
        for cmd in &sent {
            pool.dispatch(&bulk(&[cmd.as_str()]));
        }
        pool.stop_all();
        let reports = pool.await_all();

        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| r.state == WorkerState::Stopped));
        assert!(pool.workers().iter().all(|w| !w.state().is_live()));

        let mut written = buffer.lines();
        written.sort();
        let mut expected: Vec<String> = sent.iter().map(|c| format!("bulk: {c}")).collect();
        expected.sort();
        assert_eq!(written, expected);

        let total: u64 = pool.statistics().iter().map(|s| s.bulks_processed).sum();
        assert_eq!(total, 100);
        // Round-robin by load: 25 each
        assert_eq!(pool.load_counts(), vec![25, 25, 25, 25]);
    }

    #[test]
    fn test_per_worker_fifo_only() {
        // Single worker pool: output order equals dispatch order
        let (pool, buffer) = memory_pool(1);
        for i in 0..50 {
            pool.dispatch(&bulk(&[&format!("c{i}")]));
        }
        pool.stop_all();
        pool.await_all();
        let expected: Vec<String> = (0..50).map(|i| format!("bulk: c{i}")).collect();
        assert_eq!(buffer.lines(), expected);
    }

    #[test]
    fn test_multi_worker_pool_has_no_global_order_guarantee() {
        // With several workers only the set of lines is guaranteed, and each
        // worker's own bulks keep their relative order.
        let (pool, buffer) = memory_pool(3);
        for i in 0..30 {
            pool.dispatch(&bulk(&[&format!("c{i}")]));
        }
        pool.stop_all();
        pool.await_all();

        let lines = buffer.lines();
        assert_eq!(lines.len(), 30);
        for worker in 0..3 {
            let own: Vec<&String> = lines
                .iter()
                .filter(|l| {
                    let n: usize = l.trim_start_matches("bulk: c").parse().unwrap();
                    n % 3 == worker
                })
                .collect();
            let mut sorted = own.clone();
            sorted.sort_by_key(|l| l.trim_start_matches("bulk: c").parse::<usize>().unwrap());
            assert_eq!(own, sorted, "worker {worker} lost FIFO order");
        }
    }

    #[test]
    fn test_failed_worker_is_skipped() {
        let good = MemoryBuffer::default();
        let mut pool = DispatchPool::new("mixed", WriteLock::new());
        pool.add_worker(Destination::new("bad", DiskFull)).unwrap();
        pool.add_worker(Destination::new("good", good.clone())).unwrap();

        assert_eq!(pool.dispatch(&bulk(&["first"])), Some(0));
        while pool.workers()[0].state().is_live() {
            std::thread::yield_now();
        }

        for c in ["a", "b", "c"] {
            assert_eq!(pool.dispatch(&bulk(&[c])), Some(1));
        }
        pool.stop_all();
        let reports = pool.await_all();

        assert!(reports[0].is_failed());
        assert!(reports[0].failure.as_deref().unwrap().contains("disk full"));
        assert_eq!(reports[1].state, WorkerState::Stopped);
        assert_eq!(good.lines(), vec!["bulk: a", "bulk: b", "bulk: c"]);
    }

    #[test]
    fn test_all_workers_failed_drops_bulk() {
        let mut pool = DispatchPool::new("bad", WriteLock::new());
        pool.add_worker(Destination::new("bad", DiskFull)).unwrap();
        pool.dispatch(&bulk(&["x"]));
        while pool.workers()[0].state().is_live() {
            std::thread::yield_now();
        }
        assert_eq!(pool.dispatch(&bulk(&["y"])), None);
        pool.stop_all();
        pool.await_all();
    }

    #[test]
    fn test_await_twice_returns_empty() {
        let (pool, _buffer) = memory_pool(2);
        pool.stop_all();
        assert_eq!(pool.await_all().len(), 2);
        assert!(pool.await_all().is_empty());
    }
}
