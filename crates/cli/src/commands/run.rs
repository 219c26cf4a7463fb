//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{BulkBlueprint, SinkType};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Outcome of a completed `run`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Input was read to the end (or `--dry-run`)
    Completed,
    /// A shutdown signal cut input reading short
    Interrupted,
}

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<RunOutcome> {
    let blueprint = load_blueprint(args)?;
    let (blueprint, batch_size) = apply_overrides(blueprint, args)?;

    ConfigLoader::validate(&blueprint).context("Invalid configuration")?;

    info!(
        batch_size,
        sinks = blueprint.sinks.len(),
        workers = blueprint.total_workers(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint, batch_size);
        return Ok(RunOutcome::Completed);
    }

    let input = open_input(args).await?;
    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        batch_size,
        flush_on_eof: args.flush_on_eof,
    });

    let stats = pipeline.run(input, shutdown_signal()).await?;
    stats.print_summary();

    let failed = stats.failed_workers();
    if failed > 0 {
        let total = stats.reports.len();
        return Err(CliError::worker_failures(failed, total, stats.interrupted).into());
    }

    info!(
        bulks = stats.flushes.total_bulks,
        duration_secs = stats.duration.as_secs_f64(),
        "bulkmt finished"
    );
    Ok(if stats.interrupted {
        RunOutcome::Interrupted
    } else {
        RunOutcome::Completed
    })
}

/// Whether a `run` stopped reading input on a shutdown signal, failed or not.
///
/// The stdin read left pending by an interrupt cannot be cancelled, so the
/// caller has to exit the process instead of returning from `main`.
pub fn input_interrupted(result: &Result<RunOutcome>) -> bool {
    match result {
        Ok(outcome) => *outcome == RunOutcome::Interrupted,
        Err(e) => matches!(
            e.downcast_ref::<CliError>(),
            Some(CliError::WorkerFailures {
                interrupted: true,
                ..
            })
        ),
    }
}

fn load_blueprint(args: &RunArgs) -> Result<BulkBlueprint> {
    let Some(path) = &args.config else {
        info!("No configuration file, using built-in sinks");
        return Ok(BulkBlueprint::default());
    };

    info!(config = %path.display(), "Loading configuration");
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Apply command-line overrides and resolve the batch size
fn apply_overrides(
    mut blueprint: BulkBlueprint,
    args: &RunArgs,
) -> Result<(BulkBlueprint, usize), CliError> {
    if let Some(size) = args.batch_size {
        blueprint.batch.size = Some(size);
    }
    let batch_size = blueprint.batch.size.ok_or(CliError::MissingBatchSize)?;

    if let Some(dir) = &args.log_dir {
        info!(dir = %dir.display(), "Overriding file sink directory from CLI");
        for sink in blueprint
            .sinks
            .iter_mut()
            .filter(|s| s.sink_type == SinkType::File)
        {
            sink.params
                .insert("dir".to_string(), dir.display().to_string());
        }
    }

    if batch_size == 0 {
        warn!("Batch size 0: only {{ }} blocks produce bulks");
    }
    Ok((blueprint, batch_size))
}

async fn open_input(args: &RunArgs) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed that branch never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &BulkBlueprint, batch_size: usize) {
    println!("\n=== Configuration Summary ===\n");
    println!("Batch size: {batch_size}");
    println!("\nSinks ({}):", blueprint.sinks.len());
    for sink in &blueprint.sinks {
        println!(
            "  - {} ({:?}) - {} workers",
            sink.name, sink.sink_type, sink.workers
        );
    }
    println!();
}
