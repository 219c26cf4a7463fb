//! Error types for CLI operations.

use thiserror::Error;

/// Fatal conditions detected by the CLI itself
#[derive(Error, Debug)]
pub enum CliError {
    /// Neither the command line nor the configuration gives N
    #[error("no batch size: pass N on the command line or set batch.size in the configuration")]
    MissingBatchSize,

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// At least one worker ended in the failed state
    #[error("{failed} of {total} workers failed while writing bulks")]
    WorkerFailures {
        failed: usize,
        total: usize,
        /// Input reading was also cut short by a shutdown signal
        interrupted: bool,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn worker_failures(failed: usize, total: usize, interrupted: bool) -> Self {
        Self::WorkerFailures {
            failed,
            total,
            interrupted,
        }
    }
}
