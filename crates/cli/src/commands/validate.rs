//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{BulkBlueprint, SinkType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    batch_size: Option<usize>,
    sink_count: usize,
    total_workers: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    batch_size: blueprint.batch.size,
                    sink_count: blueprint.sinks.len(),
                    total_workers: blueprint.total_workers(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &BulkBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    match blueprint.batch.size {
        None => warnings.push(
            "batch.size is not set - N must be given on the command line".to_string(),
        ),
        Some(0) => warnings.push("batch.size is 0 - only { } blocks produce bulks".to_string()),
        Some(_) => {}
    }

    let consoles = blueprint
        .sinks
        .iter()
        .filter(|s| s.sink_type == SinkType::Console)
        .count();
    if consoles > 1 {
        warnings.push(format!("{consoles} console sinks - every bulk is printed {consoles} times"));
    }

    for sink in &blueprint.sinks {
        if sink.sink_type == SinkType::Console && !sink.params.is_empty() {
            warnings.push(format!("Sink '{}': console sinks ignore params", sink.name));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            match summary.batch_size {
                Some(n) => println!("  Batch size: {n}"),
                None => println!("  Batch size: (command line)"),
            }
            println!("  Sinks: {}", summary.sink_count);
            println!("  Workers: {}", summary.total_workers);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
