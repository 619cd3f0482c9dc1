//! Configuration validation
//!
//! Rules:
//! - at least one trajectory file, each with a trajectory format
//! - structure/topology files have a matching format
//! - selection range bounds are ordered
//! - buffer_size >= 1
//! - at least one consumer, names unique and non-empty

use std::collections::HashSet;
use std::path::Path;

use contracts::{ContractError, FileFormat, FileRole, RunConfig};
use validator::Validate;

/// Validate a RunConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &RunConfig) -> Result<(), ContractError> {
    validate_inputs(config)?;
    config.range.validate()?;
    validate_pipeline(config)?;
    validate_consumers(config)?;
    Ok(())
}

/// Check trajectory list and file roles
fn validate_inputs(config: &RunConfig) -> Result<(), ContractError> {
    let input = &config.input;

    if input.trajectories.is_empty() {
        return Err(ContractError::config_validation(
            "input.trajectories",
            "at least one trajectory file is required",
        ));
    }

    for (idx, path) in input.trajectories.iter().enumerate() {
        check_role(&format!("input.trajectories[{idx}]"), path, FileRole::Trajectory)?;
    }
    if let Some(ref path) = input.structure {
        check_role("input.structure", path, FileRole::Structure)?;
    }
    if let Some(ref path) = input.topology {
        check_role("input.topology", path, FileRole::Topology)?;
    }
    Ok(())
}

fn check_role(field: &str, path: &Path, role: FileRole) -> Result<(), ContractError> {
    match FileFormat::from_path(path) {
        Some(format) if format.can_be(role) => Ok(()),
        Some(format) => Err(ContractError::config_validation(
            field,
            format!("'{}' ({format:?}) cannot be used as {role:?}", path.display()),
        )),
        None => Err(ContractError::config_validation(
            field,
            format!("unrecognised file format: '{}'", path.display()),
        )),
    }
}

/// Check channel settings
fn validate_pipeline(config: &RunConfig) -> Result<(), ContractError> {
    config
        .pipeline
        .validate()
        .map_err(|e| ContractError::config_validation("pipeline", e.to_string()))
}

/// Check consumer list
fn validate_consumers(config: &RunConfig) -> Result<(), ContractError> {
    if config.consumers.is_empty() {
        return Err(ContractError::config_validation(
            "consumers",
            "at least one consumer is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, consumer) in config.consumers.iter().enumerate() {
        if consumer.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("consumers[{idx}].name"),
                "consumer name cannot be empty",
            ));
        }
        if !seen.insert(&consumer.name) {
            return Err(ContractError::config_validation(
                format!("consumers[name={}]", consumer.name),
                "duplicate consumer name",
            ));
        }
    }
    Ok(())
}
