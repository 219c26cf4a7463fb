//! # Bulk Engine
//!
//! Command batching state machine.
//!
//! Responsibilities:
//! - accumulate commands into the bulk being built
//! - detect bulk boundaries (fixed size `N`, or `{` ... `}` dynamic blocks)
//! - fan each flushed bulk out to every subscriber, in subscription order
//!
//! ## Usage
//!
//! ```
//! use bulk_engine::BoundaryDetector;
//!
//! let mut detector = BoundaryDetector::new(2);
//! assert!(detector.submit("a").is_none());
//! let bulk = detector.submit("b").unwrap();
//! assert_eq!(bulk.as_str(), "bulk: a, b");
//! ```

mod accumulator;
mod detector;

pub use accumulator::Accumulator;
pub use detector::BoundaryDetector;

// Re-export contracts types
pub use contracts::{Bulk, BulkSubscriber, Command, CommandKind, CLOSE_MARKER, OPEN_MARKER};
