//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RunConfig, TrajectoryOpener};
use ingestion::FormatRegistry;
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
    trajectory_count: usize,
    has_structure: bool,
    has_topology: bool,
    consumer_count: usize,
    buffer_size: usize,
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

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    trajectory_count: config.input.trajectories.len(),
                    has_structure: config.input.structure.is_some(),
                    has_topology: config.input.topology.is_some(),
                    consumer_count: config.consumers.len(),
                    buffer_size: config.pipeline.buffer_size,
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
fn collect_warnings(config: &RunConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let registry = FormatRegistry::new();

    if config.input.structure.is_none() && config.input.topology.is_none() {
        warnings.push("No structure or topology file - consumer systems stay empty".to_string());
    }

    for path in config.input.system_files() {
        if !registry.can_load(path) {
            warnings.push(format!(
                "No built-in loader for '{}' - the run will fail while seeding systems",
                path.display()
            ));
        }
    }

    for path in &config.input.trajectories {
        if !registry.supports(path) {
            warnings.push(format!(
                "No built-in reader for '{}' - the run will stop at this file",
                path.display()
            ));
        } else if !path.exists() {
            warnings.push(format!("Trajectory file not found: {}", path.display()));
        }
    }

    let range = &config.range;
    if range.skip.is_some() && range.stride().is_none() {
        warnings.push("range.skip < 1 - subsampling is disabled".to_string());
    }
    if let Some(time) = range.time_override() {
        if range.custom_start_time.is_none() || range.custom_dt.is_none() {
            warnings.push(format!(
                "Partial time override - frame times become {} + {} * frame",
                time.start, time.dt
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Trajectories: {}", summary.trajectory_count);
            println!("  Structure: {}", yes_no(summary.has_structure));
            println!("  Topology: {}", yes_no(summary.has_topology));
            println!("  Consumers: {}", summary.consumer_count);
            println!("  Buffer size: {}", summary.buffer_size);
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

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
