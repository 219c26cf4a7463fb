//! Bulk pipeline metrics
//!
//! Prometheus-style counters recorded through the `metrics` facade, plus an
//! in-memory aggregator for the end-of-run summary.

use contracts::Bulk;
use metrics::{counter, gauge, histogram};

/// Record one flushed (non-empty) bulk
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_bulk_flushed;
///
/// if let Some(bulk) = Bulk::render(&pending) {
///     record_bulk_flushed(&bulk);
///     // ...
/// }
/// ```
pub fn record_bulk_flushed(bulk: &Bulk) {
    counter!("bulkmt_bulks_flushed_total").increment(1);
    counter!("bulkmt_commands_flushed_total").increment(bulk.len() as u64);
    histogram!("bulkmt_bulk_size").record(bulk.len() as f64);
}

/// Record a bulk handed to one of a sink's workers
pub fn record_bulk_dispatched(sink_name: &str, worker_id: &str, load: u64) {
    counter!(
        "bulkmt_bulks_dispatched_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
    gauge!(
        "bulkmt_worker_load",
        "sink" => sink_name.to_string(),
        "worker" => worker_id.to_string()
    )
    .set(load as f64);
}

/// Record a bulk that no live worker could take
pub fn record_bulk_dropped(sink_name: &str) {
    counter!(
        "bulkmt_bulks_dropped_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// Record the outcome of a worker's write
pub fn record_bulk_written(sink_name: &str, worker_id: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "bulkmt_bulks_written_total",
        "sink" => sink_name.to_string(),
        "worker" => worker_id.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// In-memory flush statistics
#[derive(Debug, Clone, Default)]
pub struct FlushMetricsAggregator {
    /// Flushed bulks
    pub total_bulks: u64,

    /// Commands across all flushed bulks
    pub total_commands: u64,

    /// Bulk size distribution
    pub bulk_size: RunningStats,
}

impl FlushMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bulk: &Bulk) {
        self.total_bulks += 1;
        self.total_commands += bulk.len() as u64;
        self.bulk_size.push(bulk.len() as f64);
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_bulks: self.total_bulks,
            total_commands: self.total_commands,
            bulk_size: StatsSummary::from(&self.bulk_size),
        }
    }
}

/// Flush summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_bulks: u64,
    pub total_commands: u64,
    pub bulk_size: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Flush Summary ===")?;
        writeln!(f, "Bulks flushed: {}", self.total_bulks)?;
        writeln!(f, "Commands flushed: {}", self.total_commands)?;
        writeln!(f, "Bulk size: {}", self.bulk_size)
    }
}

/// Stats summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.0}, max={:.0}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
