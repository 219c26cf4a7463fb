//! Config validation
//!
//! Rules:
//! - at least one sink
//! - sink names non-empty and unique
//! - 1 <= workers <= MAX_WORKERS_PER_SINK
//! - file sink prefix is a bare file name

use std::collections::HashSet;

use contracts::{BulkBlueprint, ContractError, SinkType};
use validator::Validate;

/// Validate a BulkBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &BulkBlueprint) -> Result<(), ContractError> {
    validate_sink_names(blueprint)?;
    validate_file_params(blueprint)?;
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("sinks", e.to_string()))?;
    Ok(())
}

/// Sink names must be unique (they prefix worker ids and metric labels)
fn validate_sink_names(blueprint: &BulkBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sink in &blueprint.sinks {
        if !sink.name.is_empty() && !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

/// File sinks build `<dir>/<prefix><timestamp>.log`
fn validate_file_params(blueprint: &BulkBlueprint) -> Result<(), ContractError> {
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.sink_type != SinkType::File {
            continue;
        }
        if let Some(prefix) = sink.param("prefix") {
            if prefix.contains(['/', '\\']) {
                return Err(ContractError::config_validation(
                    format!("sinks[{idx}].params.prefix"),
                    format!("prefix '{prefix}' must not contain path separators"),
                ));
            }
        }
    }
    Ok(())
}
