//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// trajflow - streaming trajectory frame pipeline
#[derive(Parser, Debug)]
#[command(
    name = "trajflow",
    author,
    version,
    about = "Streaming molecular trajectory frame pipeline",
    long_about = "Reads trajectory files in order on a single reader thread, selects frames \n\
                  by index/time range and stride, and streams them through bounded \n\
                  channels to one or more consumers."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TRAJFLOW_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TRAJFLOW_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the frame pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "trajflow.toml", env = "TRAJFLOW_CONFIG")]
    pub config: PathBuf,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Override channel capacity
    #[arg(long, env = "TRAJFLOW_BUFFER_SIZE")]
    pub buffer_size: Option<usize>,

    /// Override progress log interval in frames (0 = off)
    #[arg(long, env = "TRAJFLOW_LOG_INTERVAL")]
    pub log_interval: Option<u64>,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TRAJFLOW_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Selection range overrides
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// First absolute frame to accept
    #[arg(long)]
    pub first_frame: Option<u64>,

    /// Last absolute frame to accept
    #[arg(long)]
    pub last_frame: Option<u64>,

    /// First time (ps) to accept
    #[arg(long)]
    pub first_time: Option<f64>,

    /// Last time (ps) to accept
    #[arg(long)]
    pub last_time: Option<f64>,

    /// Keep every N-th absolute frame (values < 1 disable)
    #[arg(long, allow_hyphen_values = true)]
    pub skip: Option<i64>,

    /// Time of absolute frame 0 when overriding frame times
    #[arg(long, allow_hyphen_values = true)]
    pub custom_start_time: Option<f64>,

    /// Time step when overriding frame times
    #[arg(long)]
    pub custom_dt: Option<f64>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "trajflow.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "trajflow.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show consumer parameters
    #[arg(long)]
    pub consumers: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
