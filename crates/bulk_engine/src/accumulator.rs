//! Commands collected for the bulk currently being built.

use contracts::{Bulk, Command};

/// Pending commands, in arrival order
#[derive(Debug, Default)]
pub struct Accumulator {
    pending: Vec<Command>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Render and clear. `None` when nothing is pending.
    pub fn take(&mut self) -> Option<Bulk> {
        let bulk = Bulk::render(&self.pending);
        self.pending.clear();
        bulk
    }

    /// Drop pending commands without rendering; returns how many were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}
