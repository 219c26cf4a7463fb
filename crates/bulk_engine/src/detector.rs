//! Batch boundary detector.

use std::fmt;
use std::sync::Arc;

use contracts::{Bulk, BulkSubscriber, Command, CommandKind};
use tracing::{debug, instrument, trace, warn};

use crate::accumulator::Accumulator;

/// Decides when the bulk being built is complete and broadcasts it.
///
/// Two rules compete:
/// - outside a block, every `batch_size` plain commands form a bulk
///   (`batch_size == 0` disables this rule);
/// - `{` opens a dynamic block that suspends the fixed-size rule until the
///   matching outermost `}`. Nested blocks only change the depth.
///
/// Flushes run synchronously on the caller's thread.
pub struct BoundaryDetector {
    batch_size: usize,
    accumulator: Accumulator,
    /// Plain commands seen at depth 0 since the last flush
    fixed_count: usize,
    block_depth: usize,
    subscribers: Vec<Arc<dyn BulkSubscriber>>,
    flushed_bulks: u64,
}

impl BoundaryDetector {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            accumulator: Accumulator::new(),
            fixed_count: 0,
            block_depth: 0,
            subscribers: Vec::new(),
            flushed_bulks: 0,
        }
    }

    /// Register a subscriber for every future flush
    pub fn subscribe(&mut self, subscriber: Arc<dyn BulkSubscriber>) {
        debug!(subscriber = subscriber.name(), "Subscriber registered");
        self.subscribers.push(subscriber);
    }

    /// Feed one command.
    ///
    /// Returns the bulk flushed by this command, if any.
    #[instrument(
        level = "trace",
        name = "boundary_submit",
        skip_all,
        fields(depth = self.block_depth)
    )]
    pub fn submit(&mut self, command: impl Into<Command>) -> Option<Bulk> {
        let command = command.into();

        match command.kind() {
            CommandKind::OpenBlock => {
                let flushed = if self.block_depth == 0 {
                    self.flush()
                } else {
                    None
                };
                self.block_depth += 1;
                flushed
            }
            CommandKind::CloseBlock => {
                if self.block_depth == 0 {
                    trace!("Unmatched close marker ignored");
                    return None;
                }
                let flushed = if self.block_depth == 1 {
                    self.flush()
                } else {
                    None
                };
                self.block_depth -= 1;
                flushed
            }
            CommandKind::Plain => {
                self.accumulator.push(command);
                if self.block_depth == 0 {
                    self.fixed_count += 1;
                    if self.fixed_count == self.batch_size {
                        return self.flush();
                    }
                }
                None
            }
        }
    }

    /// Flush pending commands to every subscriber.
    ///
    /// Nothing pending means nothing is broadcast. Resets the fixed-size
    /// counter either way.
    pub fn flush(&mut self) -> Option<Bulk> {
        self.fixed_count = 0;
        let bulk = self.accumulator.take()?;

        self.flushed_bulks += 1;
        observability::record_bulk_flushed(&bulk);
        trace!(commands = bulk.len(), "Bulk flushed");

        for subscriber in &self.subscribers {
            subscriber.update(&bulk);
        }
        Some(bulk)
    }

    /// End-of-stream handling.
    ///
    /// Outside a block the partial bulk is flushed. Inside an unterminated
    /// block its commands are discarded and the depth reset.
    pub fn finish(&mut self) -> Option<Bulk> {
        if self.block_depth == 0 {
            return self.flush();
        }

        let dropped = self.accumulator.discard();
        warn!(
            depth = self.block_depth,
            dropped, "Input ended inside an unterminated block, discarding its commands"
        );
        self.block_depth = 0;
        self.fixed_count = 0;
        None
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn block_depth(&self) -> usize {
        self.block_depth
    }

    /// Commands waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.accumulator.len()
    }

    /// Non-empty flushes so far
    pub fn flushed_bulks(&self) -> u64 {
        self.flushed_bulks
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl fmt::Debug for BoundaryDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.subscribers.iter().map(|s| s.name()).collect();
        f.debug_struct("BoundaryDetector")
            .field("batch_size", &self.batch_size)
            .field("pending", &self.accumulator.len())
            .field("fixed_count", &self.fixed_count)
            .field("block_depth", &self.block_depth)
            .field("subscribers", &names)
            .finish()
    }
}
