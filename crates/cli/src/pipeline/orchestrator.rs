//! Pipeline orchestrator - runs the dispatcher off the async runtime.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::RunConfig;
use dispatcher::DispatcherBuilder;
use tracing::info;

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Resolved run configuration, CLI overrides applied
    pub run_config: RunConfig,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    ///
    /// The reader and consumers use blocking threads, so the dispatcher is
    /// moved onto tokio's blocking pool.
    pub async fn run(self) -> Result<PipelineStats> {
        let run_config = self.config.run_config;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        if let Some(ref path) = run_config.pipeline.dump_input {
            ConfigLoader::dump_json(&run_config, path)
                .with_context(|| format!("Failed to dump input to {}", path.display()))?;
            info!(path = %path.display(), "Resolved configuration written");
        }

        let mut dispatcher = DispatcherBuilder::new(&run_config)
            .build()
            .context("Failed to create consumers")?;

        info!(
            trajectories = run_config.input.trajectories.len(),
            consumers = dispatcher.consumer_count(),
            buffer_size = run_config.pipeline.buffer_size,
            "Pipeline started"
        );

        let report = tokio::task::spawn_blocking(move || dispatcher.run())
            .await
            .map_err(|e| CliError::pipeline_execution(format!("dispatcher task failed: {e}")))??;

        Ok(PipelineStats::from_report(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::ConfigFormat;
    use ingestion::StopReason;
    use std::fmt::Write as _;
    use tempfile::tempdir;

    fn write_trajectory(path: &std::path::Path, frames: usize) {
        let mut text = String::new();
        for frame in 0..frames {
            writeln!(text, "water t= {}.0", frame * 2).unwrap();
            text.push_str("    1\n");
            text.push_str("    1SOL     OW    1   0.126   1.624   1.679\n");
            text.push_str("   1.86206   1.86206   1.86206\n");
        }
        std::fs::write(path, text).unwrap();
    }

    #[tokio::test]
    async fn test_pipeline_runs_to_completion() {
        let dir = tempdir().unwrap();
        let traj = dir.path().join("md.gro");
        write_trajectory(&traj, 5);
        let dump = dir.path().join("input.json");

        let toml = format!(
            r#"
[input]
structure = "{traj}"
trajectories = ["{traj}"]

[range]
skip = 2

[pipeline]
buffer_size = 2
dump_input = "{dump}"

[[consumers]]
name = "log"
kind = "log"
"#,
            traj = traj.display(),
            dump = dump.display()
        );
        let run_config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let stats = Pipeline::new(PipelineConfig {
            run_config,
            metrics_port: None,
        })
        .run()
        .await
        .unwrap();

        assert_eq!(stats.frames_read, 5);
        assert_eq!(stats.frames_accepted, 3);
        assert_eq!(stats.stop_reason, StopReason::Exhausted);
        assert!(!stats.fan_out);
        assert_eq!(stats.consumers[0].frames_consumed, 3);
        assert!(dump.exists());
    }
}
