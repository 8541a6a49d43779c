//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CARLA Recorder - episode recording with traffic-light and speed-limit labels
#[derive(Parser, Debug)]
#[command(
    name = "carla-recorder",
    author,
    version,
    about = "Record driving episodes labelled with the governing traffic light and speed limit",
    long_about = "Drives the per-tick frame loop against a scripted road, resolves the \n\
                  governing traffic light and speed limit each tick, and writes recorded \n\
                  episodes (images + driving_log.csv) to disk in the background."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CARLA_RECORDER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "CARLA_RECORDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default level when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the frame loop and record episodes
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "recorder.toml",
        env = "CARLA_RECORDER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the episode output directory
    #[arg(short, long, env = "CARLA_RECORDER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Stop after this many ticks (0 = until the episode limit or Ctrl+C)
    #[arg(long, default_value = "0", env = "CARLA_RECORDER_TICKS")]
    pub ticks: u64,

    /// Override frames per episode (0 = unlimited)
    #[arg(long)]
    pub frame_limit: Option<u64>,

    /// Override number of episodes (0 = unlimited)
    #[arg(long)]
    pub episode_limit: Option<u64>,

    /// Start recording automatically
    #[arg(long)]
    pub autostart: bool,

    /// Drive with the built-in rule-based policy
    #[arg(long)]
    pub drive_model: bool,

    /// Milliseconds between ticks (0 = as fast as possible)
    #[arg(long, default_value = "50", env = "CARLA_RECORDER_TICK_MS")]
    pub tick_interval_ms: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CARLA_RECORDER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "recorder.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
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
