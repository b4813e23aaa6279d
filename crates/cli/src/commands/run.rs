//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::LocatorBlueprint;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::scenario::{Scenario, ScenarioConfig};

/// Execute the `run` command
pub async fn run_scenario(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args)?;

    info!(
        requests = blueprint.requests.len(),
        declared_modes = ?blueprint.locator.declared_modes,
        frequency_hz = blueprint.simulator.frequency_hz,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let scenario = Scenario::new(ScenarioConfig {
        blueprint,
        max_readings: (args.max_readings > 0).then_some(args.max_readings),
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        ip_lookup: args.ip_lookup,
    });

    let shutdown_signal = setup_shutdown_signal();

    info!("Starting scenario...");

    tokio::select! {
        result = scenario.run() => {
            let stats = result.context("Scenario execution failed")?;
            info!(
                readings = stats.aggregator.readings,
                duration_secs = stats.duration.as_secs_f64(),
                completed = format!("{:.1}%", stats.completion_rate()),
                "Scenario completed"
            );
            stats.print_summary();
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping scenario...");
        }
    }

    info!("Locator CLI finished");
    Ok(())
}

/// Apply CLI overrides, re-checking the values they replace
fn apply_overrides(blueprint: &mut LocatorBlueprint, args: &RunArgs) -> Result<()> {
    if let Some(hz) = args.frequency_hz {
        if !hz.is_finite() || hz <= 0.0 {
            anyhow::bail!("--frequency-hz must be > 0, got {hz}");
        }
        info!(frequency_hz = hz, "Overriding simulator frequency from CLI");
        blueprint.simulator.frequency_hz = hz;
    }
    if let Some(ms) = args.default_timeout_ms {
        if ms == 0 {
            anyhow::bail!("--default-timeout-ms must be > 0");
        }
        info!(default_timeout_ms = ms, "Overriding default timeout from CLI");
        blueprint.locator.default_timeout = Some(Duration::from_millis(ms));
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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
fn print_config_summary(blueprint: &LocatorBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Locator:");
    println!("  Declared modes: {:?}", blueprint.locator.declared_modes);
    match blueprint.locator.default_timeout {
        Some(timeout) => println!("  Default timeout: {:?}", timeout),
        None => println!("  Default timeout: none"),
    }
    println!("  IP lookup timeout: {:?}", blueprint.locator.ip_lookup_timeout);

    let sim = &blueprint.simulator;
    println!("\nSimulator:");
    println!("  Frequency: {} Hz", sim.frequency_hz);
    println!("  Start: {:.5}, {:.5}", sim.start.latitude, sim.start.longitude);
    println!(
        "  Authorization: {:?} -> {:?}",
        sim.initial_authorization, sim.authorization_response
    );

    println!("\nRequests ({}):", blueprint.requests.len());
    for (i, request) in blueprint.requests.iter().enumerate() {
        println!(
            "  {}. {:?} / {:?} / {:?}",
            i + 1,
            request.accuracy,
            request.service,
            request.mode
        );
    }

    println!();
}
