//! Worker statistics for the shutdown report

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::Bulk;

/// Counters updated by a single worker thread
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    /// Bulks written
    bulks_processed: AtomicU64,
    /// Commands written (separator-derived, see `Bulk::approx_command_count`)
    commands_processed: AtomicU64,
    /// Write failures (0 or 1: a worker stops on its first failure)
    failure_count: AtomicU64,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one successfully written bulk
    pub fn record_written(&self, bulk: &Bulk) {
        self.bulks_processed.fetch_add(1, Ordering::Relaxed);
        self.commands_processed
            .fetch_add(bulk.approx_command_count(), Ordering::Relaxed);
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bulks_processed(&self) -> u64 {
        self.bulks_processed.load(Ordering::Relaxed)
    }

    pub fn commands_processed(&self) -> u64 {
        self.commands_processed.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            bulks_processed: self.bulks_processed(),
            commands_processed: self.commands_processed(),
        }
    }
}

/// Snapshot of a worker's counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub bulks_processed: u64,
    pub commands_processed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Command;

    #[test]
    fn test_record_written_uses_separator_count() {
        let metrics = WorkerMetrics::new();
        let cmds = vec![Command::from("a,b"), Command::from("c")];
        metrics.record_written(&Bulk::render(&cmds).unwrap());

        let stats = metrics.snapshot();
        assert_eq!(stats.bulks_processed, 1);
        assert_eq!(stats.commands_processed, 3);
        assert_eq!(metrics.failure_count(), 0);
    }
}
