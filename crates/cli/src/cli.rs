//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Locator - shared location sensor arbitration
#[derive(Parser, Debug)]
#[command(
    name = "locator-cli",
    author,
    version,
    about = "Run location request scenarios against a simulated sensor",
    long_about = "Loads a locator blueprint, drives a simulated location sensor, submits the \n\
                  configured requests and reports how each one was resolved."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LOCATOR_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LOCATOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the request scenario from a configuration file
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
    #[arg(short, long, default_value = "locator.toml", env = "LOCATOR_CONFIG")]
    pub config: PathBuf,

    /// Override the simulated sensor frequency (Hz)
    #[arg(long, env = "LOCATOR_FREQUENCY_HZ")]
    pub frequency_hz: Option<f64>,

    /// Override the default request timeout (milliseconds)
    #[arg(long, env = "LOCATOR_DEFAULT_TIMEOUT_MS")]
    pub default_timeout_ms: Option<u64>,

    /// Stop after this many readings were delivered (0 = unlimited)
    #[arg(long, default_value = "0", env = "LOCATOR_MAX_READINGS")]
    pub max_readings: u64,

    /// Scenario duration limit in seconds (0 = until every request resolves)
    #[arg(long, default_value = "0", env = "LOCATOR_DURATION")]
    pub duration: u64,

    /// Also run one IP lookup next to the sensor requests
    #[arg(long)]
    pub ip_lookup: bool,

    /// Validate configuration and exit without running the scenario
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LOCATOR_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "locator.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "locator.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show every configured request
    #[arg(long)]
    pub requests: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
