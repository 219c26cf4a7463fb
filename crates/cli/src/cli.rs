//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// bulkmt - groups a command stream into bulks and fans them out to sinks
#[derive(Parser, Debug)]
#[command(
    name = "bulkmt",
    author,
    version,
    about = "Batch commands into bulks and write them through worker pools",
    long_about = "Reads one command per line, groups commands into bulks of N or into \n\
                  `{` ... `}` blocks, and hands every bulk to each configured sink. \n\
                  Each sink writes through its own pool of worker threads."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BULKMT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BULKMT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read commands and write bulks
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Bulk size N; overrides `batch.size` from the configuration (0 = blocks only)
    pub batch_size: Option<usize>,

    /// Path to configuration file (TOML or JSON); built-in wiring if omitted
    #[arg(short, long, env = "BULKMT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read commands from this file instead of stdin
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Directory for file sinks, overriding their `dir` param
    #[arg(long, env = "BULKMT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Flush the trailing partial bulk when input ends
    #[arg(long)]
    pub flush_on_eof: bool,

    /// Prometheus metrics port (disabled if omitted or 0)
    #[arg(long, env = "BULKMT_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Validate configuration and exit without reading input
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bulkmt.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "bulkmt.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
