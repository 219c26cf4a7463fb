//! BulkSubscriber trait - Boundary detector output interface
//!
//! Defines the capability every sink exposes to the detector.

use crate::Bulk;

/// Receiver of flushed bulks.
///
/// Called synchronously on the ingestion thread for every flush, in
/// subscription order. Implementations must hand the bulk off (e.g. enqueue
/// it for a worker) and return; blocking I/O here stalls ingestion.
pub trait BulkSubscriber: Send + Sync {
    /// Subscriber name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Accept one rendered bulk
    fn update(&self, bulk: &Bulk);
}
