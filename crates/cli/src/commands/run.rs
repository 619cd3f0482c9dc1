//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::RunConfig;
use tracing::{error, info, warn};

use crate::cli::{RangeArgs, RunArgs};
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Exit status after an interrupt (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let mut run_config = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides, then re-check them
    apply_overrides(&mut run_config, args);
    ConfigLoader::validate(&run_config)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    info!(
        trajectories = run_config.input.trajectories.len(),
        structure = ?run_config.input.structure,
        consumers = run_config.consumers.len(),
        buffer_size = run_config.pipeline.buffer_size,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&run_config);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        run_config,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    });

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting pipeline...");

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Pipeline execution failed")?;
            if let Some(ref message) = stats.read_error {
                warn!(error = %message, "Trajectory reading stopped early");
            }
            info!(
                frames_read = stats.frames_read,
                frames_accepted = stats.frames_accepted,
                duration_secs = stats.duration.as_secs_f64(),
                fps = format!("{:.2}", stats.fps()),
                "Pipeline completed successfully"
            );
            stats.print_summary();
        }
        _ = shutdown_signal => {
            // Reader and consumer threads cannot be interrupted mid-frame
            warn!("Received shutdown signal, aborting run");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    }

    info!("trajflow finished");
    Ok(())
}

/// Apply `run` command overrides on top of the loaded configuration
fn apply_overrides(config: &mut RunConfig, args: &RunArgs) {
    if let Some(buffer_size) = args.buffer_size {
        info!(buffer_size, "Overriding buffer size from CLI");
        config.pipeline.buffer_size = buffer_size;
    }
    if let Some(log_interval) = args.log_interval {
        config.pipeline.log_interval = log_interval;
    }
    apply_range_overrides(config, &args.range);
}

fn apply_range_overrides(config: &mut RunConfig, range: &RangeArgs) {
    let target = &mut config.range;
    let overrides = [
        (range.first_frame.is_some(), "first_frame"),
        (range.last_frame.is_some(), "last_frame"),
        (range.first_time.is_some(), "first_time"),
        (range.last_time.is_some(), "last_time"),
        (range.skip.is_some(), "skip"),
        (range.custom_start_time.is_some(), "custom_start_time"),
        (range.custom_dt.is_some(), "custom_dt"),
    ];
    for (_, field) in overrides.iter().filter(|(set, _)| *set) {
        info!(field, "Overriding selection range from CLI");
    }

    target.first_frame = range.first_frame.or(target.first_frame);
    target.last_frame = range.last_frame.or(target.last_frame);
    target.first_time = range.first_time.or(target.first_time);
    target.last_time = range.last_time.or(target.last_time);
    target.skip = range.skip.or(target.skip);
    target.custom_start_time = range.custom_start_time.or(target.custom_start_time);
    target.custom_dt = range.custom_dt.or(target.custom_dt);
}

/// Setup Ctrl+C and SIGTERM signal handlers
///
/// A handler that fails to install never resolves.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
fn print_config_summary(config: &RunConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Input:");
    if let Some(ref structure) = config.input.structure {
        println!("  Structure: {}", structure.display());
    }
    if let Some(ref topology) = config.input.topology {
        println!("  Topology: {}", topology.display());
    }
    println!("  Trajectories ({}):", config.input.trajectories.len());
    for path in &config.input.trajectories {
        println!("    - {}", path.display());
    }

    let range = &config.range;
    println!("\nSelection:");
    println!(
        "  Frames: {:?} ..= {:?}",
        range.first_frame, range.last_frame
    );
    println!("  Time: {:?} ..= {:?}", range.first_time, range.last_time);
    match range.stride() {
        Some(stride) => println!("  Stride: every {stride} frames"),
        None => println!("  Stride: off"),
    }
    if let Some(time) = range.time_override() {
        println!("  Time override: {} + {} * frame", time.start, time.dt);
    }

    println!("\nConsumers ({}):", config.consumers.len());
    for consumer in &config.consumers {
        println!("  - {} ({:?})", consumer.name, consumer.kind);
    }
    println!(
        "\nChannel capacity: {}{}",
        config.pipeline.buffer_size,
        if config.consumers.len() > 1 {
            " (per consumer)"
        } else {
            ""
        }
    );

    println!();
}
