//! # bulkmt CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - configuration loading and validation
//! - the command pipeline from stdin (or a file) to the configured sinks
//! - graceful shutdown on Ctrl+C / SIGTERM

mod cli;
mod commands;
mod error;
mod pipeline;

use std::process::ExitCode;

use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{RunOutcome, input_interrupted, run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = observability::init_with_config(observability_config(&cli)) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "bulkmt starting");

    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args).map(|()| RunOutcome::Completed),
        Commands::Info(args) => run_info(args).map(|()| RunOutcome::Completed),
    };

    let code = match result {
        Ok(_) => 0,
        Err(ref e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            1
        }
    };

    // A pending stdin read cannot be cancelled and would keep the runtime
    // from shutting down after an interrupt, successful or not.
    if input_interrupted(&result) {
        std::process::exit(i32::from(code));
    }
    ExitCode::from(code)
}

/// Map CLI flags onto the observability setup
fn observability_config(cli: &Cli) -> ObservabilityConfig {
    let (level, force_level) = if cli.quiet {
        ("error", true)
    } else {
        match cli.verbose {
            0 => ("info", false),
            1 => ("debug", false),
            _ => ("trace", false),
        }
    };

    let metrics_port = match &cli.command {
        Commands::Run(args) => args.metrics_port,
        _ => None,
    };

    ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port,
        default_log_level: level.to_string(),
        force_level,
    }
}
