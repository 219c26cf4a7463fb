//! Pipeline orchestrator - wires line source, detector and sinks together.

use std::future::Future;
use std::time::Instant;

use anyhow::{Context, Result};
use bulk_engine::BoundaryDetector;
use contracts::BulkBlueprint;
use dispatcher::{DispatcherBuilder, DispatcherConfig, WriteLock};
use observability::FlushMetricsAggregator;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated blueprint; only `sinks` is read here
    pub blueprint: BulkBlueprint,

    /// Resolved bulk size N
    pub batch_size: usize,

    /// Flush the trailing partial bulk at end of input
    pub flush_on_eof: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    write_lock: WriteLock,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            write_lock: WriteLock::new(),
        }
    }

    /// Run until `input` is exhausted or `shutdown` resolves.
    ///
    /// Either way every sink is stopped and drained before this returns.
    pub async fn run<R, S>(self, input: R, shutdown: S) -> Result<PipelineStats>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();

        let dispatcher = DispatcherBuilder::new(DispatcherConfig {
            sinks: self.config.blueprint.sinks.clone(),
        })
        .with_write_lock(self.write_lock.clone())
        .build()
        .context("Failed to start sinks")?;

        let mut detector = BoundaryDetector::new(self.config.batch_size);
        for subscriber in dispatcher.subscribers() {
            detector.subscribe(subscriber);
        }

        info!(
            batch_size = self.config.batch_size,
            sinks = dispatcher.handles().len(),
            workers = self.config.blueprint.total_workers(),
            "Pipeline started"
        );

        let mut stats = PipelineStats::default();
        let mut flushes = FlushMetricsAggregator::new();
        let read_result =
            read_commands(input, shutdown, &mut detector, &mut flushes, &mut stats).await;

        if self.config.flush_on_eof {
            if let Some(bulk) = detector.finish() {
                flushes.update(&bulk);
            }
        } else if detector.pending_len() > 0 || detector.block_depth() > 0 {
            debug!(
                pending = detector.pending_len(),
                depth = detector.block_depth(),
                "Input ended with an incomplete bulk, not flushed"
            );
        }
        // Releases the detector's references to the sinks
        drop(detector);

        info!("Input finished, draining sinks");
        let reports = tokio::task::spawn_blocking(move || dispatcher.shutdown())
            .await
            .context("Sink shutdown task failed")?;

        stats.reports = reports;
        stats.flushes = flushes;
        stats.duration = start_time.elapsed();

        read_result?;
        Ok(stats)
    }
}

/// Feed every non-empty input line to the detector
async fn read_commands<R, S>(
    input: R,
    shutdown: S,
    detector: &mut BoundaryDetector,
    flushes: &mut FlushMetricsAggregator,
    stats: &mut PipelineStats,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    return Ok(());
                };
                stats.lines_read += 1;

                let command = line.strip_suffix('\r').unwrap_or(&line);
                if command.is_empty() {
                    continue;
                }
                stats.commands_submitted += 1;
                if let Some(bulk) = detector.submit(command) {
                    flushes.update(&bulk);
                }
            }
            _ = &mut shutdown => {
                warn!(lines = stats.lines_read, "Shutdown requested, input reading stopped");
                stats.interrupted = true;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkConfig, SinkType};
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::TempDir;

    fn file_blueprint(dir: &Path, workers: usize) -> BulkBlueprint {
        BulkBlueprint {
            sinks: vec![SinkConfig {
                name: "file".to_string(),
                sink_type: SinkType::File,
                workers,
                params: HashMap::from([(
                    "dir".to_string(),
                    dir.to_str().unwrap().to_string(),
                )]),
            }],
            ..BulkBlueprint::default()
        }
    }

    fn written_lines(dir: &Path) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            let content = std::fs::read_to_string(entry.unwrap().path()).unwrap();
            lines.extend(content.lines().map(str::to_string));
        }
        lines
    }

    fn pipeline(dir: &Path, batch_size: usize, flush_on_eof: bool) -> Pipeline {
        Pipeline::new(PipelineConfig {
            blueprint: file_blueprint(dir, 1),
            batch_size,
            flush_on_eof,
        })
    }

    #[tokio::test]
    async fn test_run_writes_bulks_in_order() {
        let temp = TempDir::new().unwrap();
        let input: &[u8] = b"cmd1\ncmd2\ncmd3\n{\ncmd4\ncmd5\ncmd6\ncmd7\n}\ncmd8\n";

        let stats = pipeline(temp.path(), 3, false)
            .run(input, std::future::pending())
            .await
            .unwrap();

        assert_eq!(
            written_lines(temp.path()),
            vec!["bulk: cmd1, cmd2, cmd3", "bulk: cmd4, cmd5, cmd6, cmd7"]
        );
        assert_eq!(stats.lines_read, 10);
        assert_eq!(stats.flushes.total_bulks, 2);
        assert_eq!(stats.bulks_written(), 2);
        assert_eq!(stats.failed_workers(), 0);
        assert!(!stats.interrupted);
    }

    #[tokio::test]
    async fn test_trailing_partial_dropped_by_default() {
        let temp = TempDir::new().unwrap();
        let input: &[u8] = b"a\nb\n";
        let stats = pipeline(temp.path(), 3, false)
            .run(input, std::future::pending())
            .await
            .unwrap();
        assert!(written_lines(temp.path()).is_empty());
        assert_eq!(stats.flushes.total_bulks, 0);
    }

    #[tokio::test]
    async fn test_flush_on_eof_writes_partial() {
        let temp = TempDir::new().unwrap();
        let input: &[u8] = b"a\r\n\nb\r\n";
        let stats = pipeline(temp.path(), 3, true)
            .run(input, std::future::pending())
            .await
            .unwrap();
        assert_eq!(written_lines(temp.path()), vec!["bulk: a, b"]);
        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.commands_submitted, 2);
    }

    #[tokio::test]
    async fn test_flush_on_eof_discards_open_block() {
        let temp = TempDir::new().unwrap();
        let input: &[u8] = b"a\n{\nb\n";
        pipeline(temp.path(), 5, true)
            .run(input, std::future::pending())
            .await
            .unwrap();
        assert_eq!(written_lines(temp.path()), vec!["bulk: a"]);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_reading_but_drains() {
        let temp = TempDir::new().unwrap();
        // Never ends: the reader half stays open
        let (_writer, reader) = tokio::io::duplex(64);
        let reader = tokio::io::BufReader::new(reader);

        let stats = pipeline(temp.path(), 1, false)
            .run(reader, async {})
            .await
            .unwrap();
        assert!(stats.interrupted);
        assert_eq!(stats.reports.len(), 1);
    }
}
