//! `locator-cli`: drive the shared locator against the simulated sensor
//!
//! `run` 回放场景文件中的请求，`validate` 只做配置检查，`info`
//! 打印蓝图摘要。日志统一走 tracing，`RUST_LOG` 优先于 `-v/-q`。

mod cli;
mod commands;
mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cli::{Cli, Commands, LogFormat};
use commands::{run_info, run_scenario, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "locator-cli starting");
    let outcome = match &cli.command {
        Commands::Run(args) => run_scenario(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };
    if let Err(e) = &outcome {
        error!(error = %format!("{e:#}"), "command failed");
    }
    outcome
}

/// Level used when `RUST_LOG` is unset; `--quiet` overrides both
fn default_directive(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let directive = default_directive(cli.quiet, cli.verbose);
    let filter = if cli.quiet {
        EnvFilter::new(directive)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
    };

    let output = match cli.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .context("installing the tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false, 0), "info");
        assert_eq!(default_directive(false, 1), "debug");
        assert_eq!(default_directive(false, 4), "trace");
        assert_eq!(default_directive(true, 0), "warn");
    }
}
