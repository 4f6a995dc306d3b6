//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::RowOrigin;
use std::path::PathBuf;

/// Camera Publisher - periodic color/depth capture published on two channels
#[derive(Parser, Debug)]
#[command(
    name = "camera-publisher",
    author,
    version,
    about = "Synthetic color/depth camera publisher",
    long_about = "Captures a color and a depth frame from a render target at a fixed rate,\n\
                  converts both into image messages and publishes them on the color\n\
                  and depth channels to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CAMERA_PUBLISHER_VERBOSE")]
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
        env = "CAMERA_PUBLISHER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the capture and publish loop
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
    #[arg(
        short,
        long,
        default_value = "camera.toml",
        env = "CAMERA_PUBLISHER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the publish rate (cycles per second)
    #[arg(long, env = "CAMERA_PUBLISHER_RATE")]
    pub rate: Option<f64>,

    /// Override the render target width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Override the render target height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Override the renderer's row origin
    #[arg(long, value_enum)]
    pub origin: Option<OriginArg>,

    /// Stop after this many publish cycles (0 = unlimited)
    #[arg(long, default_value = "0", env = "CAMERA_PUBLISHER_MAX_CYCLES")]
    pub max_cycles: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "CAMERA_PUBLISHER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "CAMERA_PUBLISHER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "camera.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "camera.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink parameters
    #[arg(long)]
    pub sinks: bool,
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

/// Row origin of the renderer's native storage
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OriginArg {
    /// Row 0 is the top of the image
    TopLeft,
    /// Row 0 is the bottom of the image
    BottomLeft,
}

impl From<OriginArg> for RowOrigin {
    fn from(origin: OriginArg) -> Self {
        match origin {
            OriginArg::TopLeft => Self::TopLeft,
            OriginArg::BottomLeft => Self::BottomLeft,
        }
    }
}
