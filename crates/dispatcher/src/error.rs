//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Destination of a sink could not be opened
    #[error("failed to create sink '{name}': {source}")]
    SinkCreation {
        name: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Worker thread could not be started
    #[error("failed to spawn worker '{worker_id}': {source}")]
    WorkerSpawn {
        worker_id: String,
        #[source]
        source: std::io::Error,
    },
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, source: contracts::ContractError) -> Self {
        Self::SinkCreation {
            name: name.into(),
            source,
        }
    }
}
