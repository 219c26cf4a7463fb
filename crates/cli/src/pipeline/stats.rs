//! Pipeline statistics and the shutdown report.

use std::fmt::Write as _;
use std::time::Duration;

use dispatcher::WorkerReport;
use observability::FlushMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Input lines read, empty ones included
    pub lines_read: u64,

    /// Non-empty lines handed to the detector
    pub commands_submitted: u64,

    /// Reading stopped on a shutdown signal instead of end of input
    pub interrupted: bool,

    /// Total duration of the run
    pub duration: Duration,

    /// Flushed bulk statistics
    pub flushes: FlushMetricsAggregator,

    /// One report per worker, in sink then pool order
    pub reports: Vec<WorkerReport>,
}

impl PipelineStats {
    /// Bulks written across all workers of all sinks
    pub fn bulks_written(&self) -> u64 {
        self.reports.iter().map(|r| r.stats.bulks_processed).sum()
    }

    pub fn failed_workers(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failed()).count()
    }

    /// Human-readable report, one line per worker
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== bulkmt statistics ===");
        let _ = writeln!(
            out,
            "input: {} lines, {} commands{}",
            self.lines_read,
            self.commands_submitted,
            if self.interrupted { " (interrupted)" } else { "" }
        );
        let _ = write!(out, "{}", self.flushes.summary());

        for report in &self.reports {
            let _ = write!(
                out,
                "{}: {} bulks, {} commands, {}",
                report.worker_id,
                report.stats.bulks_processed,
                report.stats.commands_processed,
                report.state
            );
            if let Some(failure) = &report.failure {
                let _ = write!(out, " ({failure}; {} abandoned)", report.abandoned);
            }
            out.push('\n');
        }

        let _ = writeln!(
            out,
            "written: {} bulks, {} failed workers",
            self.bulks_written(),
            self.failed_workers()
        );
        let _ = writeln!(out, "duration: {:.3}s", self.duration.as_secs_f64());
        out
    }

    /// Print the report on stderr, away from console-sink output
    pub fn print_summary(&self) {
        eprint!("{}", self.render());
    }
}
