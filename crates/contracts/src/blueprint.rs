//! BulkBlueprint - Config Loader output
//!
//! Describes the whole run: batch sizing and the sinks that receive bulks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Upper bound for a single sink's worker pool.
pub const MAX_WORKERS_PER_SINK: usize = 64;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Batch sizing
    #[serde(default)]
    pub batch: BatchConfig,

    /// Output routing
    #[serde(default = "default_sinks")]
    #[validate(length(min = 1, message = "at least one sink is required"), nested)]
    pub sinks: Vec<SinkConfig>,
}

impl Default for BulkBlueprint {
    /// Console sink with one worker plus a log-file sink with two workers.
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            batch: BatchConfig::default(),
            sinks: default_sinks(),
        }
    }
}

impl BulkBlueprint {
    /// Default wiring with the given batch size
    pub fn with_batch_size(size: usize) -> Self {
        Self {
            batch: BatchConfig { size: Some(size) },
            ..Self::default()
        }
    }

    /// Total worker threads across all sinks
    pub fn total_workers(&self) -> usize {
        self.sinks.iter().map(|s| s.workers).sum()
    }
}

fn default_sinks() -> Vec<SinkConfig> {
    vec![
        SinkConfig {
            name: "console".to_string(),
            sink_type: SinkType::Console,
            workers: 1,
            params: HashMap::new(),
        },
        SinkConfig {
            name: "file".to_string(),
            sink_type: SinkType::File,
            workers: 2,
            params: HashMap::new(),
        },
    ]
}

/// Batch sizing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Fixed bulk size N. `0` disables the fixed-size rule.
    ///
    /// May be left out of the file and supplied on the command line instead.
    #[serde(default)]
    pub size: Option<usize>,
}

/// Sink output config
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1, message = "sink name cannot be empty"))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Worker pool size
    #[serde(default = "default_workers")]
    #[validate(range(min = 1, max = 64, message = "workers must be between 1 and 64"))]
    pub workers: usize,

    /// Type-specific params
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_workers() -> usize {
    1
}

impl SinkConfig {
    /// Look up a type-specific parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Standard output
    Console,
    /// Timestamped log file (`params.dir`, `params.prefix`)
    File,
}
