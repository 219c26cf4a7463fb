//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::BulkBlueprint;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    batch_size: Option<usize>,
    total_workers: usize,
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    workers: usize,
    worker_ids: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &BulkBlueprint) -> ConfigInfo {
    let sinks = blueprint
        .sinks
        .iter()
        .map(|s| SinkInfo {
            name: s.name.clone(),
            sink_type: format!("{:?}", s.sink_type),
            workers: s.workers,
            worker_ids: (0..s.workers).map(|i| format!("{}-{i}", s.name)).collect(),
            params: s.params.clone().into_iter().collect(),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        batch_size: blueprint.batch.size,
        total_workers: blueprint.total_workers(),
        sinks,
    }
}

fn print_config_info(blueprint: &BulkBlueprint) {
    println!("bulkmt configuration ({:?})", blueprint.version);
    match blueprint.batch.size {
        Some(n) => println!("   ├─ Batch size: {n}"),
        None => println!("   ├─ Batch size: (command line)"),
    }
    println!("   └─ Workers: {}", blueprint.total_workers());

    println!("\nSinks ({})", blueprint.sinks.len());
    for (i, sink) in blueprint.sinks.iter().enumerate() {
        let is_last = i == blueprint.sinks.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} ({:?}, {} workers)",
            prefix, sink.name, sink.sink_type, sink.workers
        );
        let params: BTreeMap<_, _> = sink.params.iter().collect();
        for (key, value) in params {
            println!("   {}  {} = {}", child_prefix, key, value);
        }
    }
}
