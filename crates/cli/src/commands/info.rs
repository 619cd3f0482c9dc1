//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::{RunConfig, SelectionRange};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    input: InputInfo,
    range: SelectionRange,
    pipeline: PipelineInfo,
    consumers: Vec<ConsumerInfo>,
}

#[derive(Serialize)]
struct InputInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    structure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topology: Option<String>,
    trajectories: Vec<String>,
}

#[derive(Serialize)]
struct PipelineInfo {
    buffer_size: usize,
    fan_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_interval: Option<u64>,
}

#[derive(Serialize)]
struct ConsumerInfo {
    ordinal: usize,
    name: String,
    kind: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &RunConfig, args: &InfoArgs) -> ConfigInfo {
    let consumers = config
        .consumers
        .iter()
        .enumerate()
        .map(|(ordinal, c)| ConsumerInfo {
            ordinal,
            name: c.name.clone(),
            kind: format!("{:?}", c.kind),
            params: if args.consumers {
                c.params.clone()
            } else {
                HashMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", config.version),
        input: InputInfo {
            structure: config
                .input
                .structure
                .as_ref()
                .map(|p| p.display().to_string()),
            topology: config
                .input
                .topology
                .as_ref()
                .map(|p| p.display().to_string()),
            trajectories: config
                .input
                .trajectories
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        },
        range: config.range,
        pipeline: PipelineInfo {
            buffer_size: config.pipeline.buffer_size,
            fan_out: config.consumers.len() > 1,
            log_interval: config.pipeline.log_interval(),
        },
        consumers,
    }
}

fn print_config_info(config: &RunConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  trajflow Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Input files
    let input = &config.input;
    println!("Input");
    println!("   ├─ Version: {:?}", config.version);
    println!(
        "   ├─ Structure: {}",
        input
            .structure
            .as_ref()
            .map_or("(none)".to_string(), |p| p.display().to_string())
    );
    println!(
        "   ├─ Topology: {}",
        input
            .topology
            .as_ref()
            .map_or("(none)".to_string(), |p| p.display().to_string())
    );
    println!("   └─ Trajectories ({})", input.trajectories.len());
    for (i, path) in input.trajectories.iter().enumerate() {
        let prefix = if i == input.trajectories.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!("         {} {}", prefix, path.display());
    }

    // Selection range
    let range = &config.range;
    println!("\nSelection");
    println!("   ├─ Frames: {:?} ..= {:?}", range.first_frame, range.last_frame);
    println!("   ├─ Time: {:?} ..= {:?}", range.first_time, range.last_time);
    match range.time_override() {
        Some(time) => println!("   ├─ Time override: {} + {} * frame", time.start, time.dt),
        None => println!("   ├─ Time override: off"),
    }
    if range.window_size_frames.is_some() || range.window_size_time.is_some() {
        println!(
            "   ├─ Window: {:?} frames / {:?} ps",
            range.window_size_frames, range.window_size_time
        );
    }
    match range.stride() {
        Some(stride) => println!("   └─ Stride: {}", stride),
        None => println!("   └─ Stride: off"),
    }

    // Pipeline
    println!("\nPipeline");
    println!("   ├─ Buffer size: {}", config.pipeline.buffer_size);
    println!(
        "   ├─ Mode: {}",
        if config.consumers.len() > 1 {
            "fan-out"
        } else {
            "single consumer"
        }
    );
    match config.pipeline.log_interval() {
        Some(n) => println!("   └─ Progress log: every {} frames", n),
        None => println!("   └─ Progress log: off"),
    }

    // Consumers
    println!("\nConsumers ({})", config.consumers.len());
    for (i, consumer) in config.consumers.iter().enumerate() {
        let is_last = i == config.consumers.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} #{} {} ({:?})", prefix, i, consumer.name, consumer.kind);

        if args.consumers && !consumer.params.is_empty() {
            let mut params: Vec<_> = consumer.params.iter().collect();
            params.sort();
            for (j, (key, value)) in params.iter().enumerate() {
                let param_prefix = if j == params.len() - 1 { "└─" } else { "├─" };
                println!("   {}  {} {} = {}", child_prefix, param_prefix, key, value);
            }
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_build_config_info() {
        let config = ConfigLoader::load_from_str(
            r#"
[input]
structure = "conf.gro"
trajectories = ["a.gro", "b.gro"]

[[consumers]]
name = "log"
kind = "log"

[[consumers]]
name = "disk"
kind = "file"
params = { format = "bincode" }
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let args = InfoArgs {
            config: "run.toml".into(),
            json: true,
            consumers: true,
        };
        let info = build_config_info(&config, &args);
        assert!(info.pipeline.fan_out);
        assert_eq!(info.input.trajectories, vec!["a.gro", "b.gro"]);
        assert_eq!(info.consumers[1].ordinal, 1);
        assert_eq!(info.consumers[1].params["format"], "bincode");

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["consumers"][0]["kind"], "Log");
        assert!(json["input"].get("topology").is_none());
    }
}
