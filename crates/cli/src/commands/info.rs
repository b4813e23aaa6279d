//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{LocatorBlueprint, RequestOptions};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    locator: LocatorInfo,
    simulator: SimulatorInfo,
    request_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    requests: Vec<RequestInfo>,
}

#[derive(Serialize)]
struct LocatorInfo {
    declared_modes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_timeout_ms: Option<u128>,
    ip_lookup_timeout_ms: u128,
}

#[derive(Serialize)]
struct SimulatorInfo {
    frequency_hz: f64,
    start: [f64; 2],
    step_meters: f64,
    horizontal_accuracy: f64,
    initial_authorization: String,
    authorization_response: String,
}

#[derive(Serialize)]
struct RequestInfo {
    accuracy: String,
    service: String,
    mode: String,
    required_authorization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u128>,
    avoid_authorization_prompt: bool,
}

impl From<&RequestOptions> for RequestInfo {
    fn from(r: &RequestOptions) -> Self {
        Self {
            accuracy: format!("{:?}", r.accuracy),
            service: format!("{:?}", r.service),
            mode: format!("{:?}", r.mode),
            required_authorization: format!("{:?}", r.required_authorization()),
            min_distance: r.min_distance,
            timeout_ms: r.timeout.map(|t| t.as_millis()),
            avoid_authorization_prompt: r.avoid_authorization_prompt,
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &LocatorBlueprint, args: &InfoArgs) -> ConfigInfo {
    let locator = &blueprint.locator;
    let sim = &blueprint.simulator;

    let requests = if args.requests {
        blueprint.requests.iter().map(RequestInfo::from).collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        locator: LocatorInfo {
            declared_modes: locator
                .declared_modes
                .iter()
                .map(|m| format!("{:?}", m))
                .collect(),
            default_timeout_ms: locator.default_timeout.map(|t| t.as_millis()),
            ip_lookup_timeout_ms: locator.ip_lookup_timeout.as_millis(),
        },
        simulator: SimulatorInfo {
            frequency_hz: sim.frequency_hz,
            start: [sim.start.latitude, sim.start.longitude],
            step_meters: sim.step_meters,
            horizontal_accuracy: sim.horizontal_accuracy,
            initial_authorization: format!("{:?}", sim.initial_authorization),
            authorization_response: format!("{:?}", sim.authorization_response),
        },
        request_count: blueprint.requests.len(),
        requests,
    }
}

fn print_config_info(blueprint: &LocatorBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Locator Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let locator = &blueprint.locator;
    println!("🔐 Locator");
    println!("   ├─ Version: {:?}", blueprint.version);
    if locator.declared_modes.is_empty() {
        println!("   ├─ Declared modes: (none)");
    } else {
        println!("   ├─ Declared modes: {:?}", locator.declared_modes);
    }
    match locator.default_timeout {
        Some(timeout) => println!("   ├─ Default timeout: {:?}", timeout),
        None => println!("   ├─ Default timeout: (none)"),
    }
    println!("   └─ IP lookup timeout: {:?}", locator.ip_lookup_timeout);

    let sim = &blueprint.simulator;
    println!("\n🛰️  Simulator");
    println!("   ├─ Frequency: {} Hz", sim.frequency_hz);
    println!(
        "   ├─ Start: {:.5}, {:.5}",
        sim.start.latitude, sim.start.longitude
    );
    println!(
        "   ├─ Step: {} m, accuracy {} m",
        sim.step_meters, sim.horizontal_accuracy
    );
    println!(
        "   └─ Authorization: {:?} (prompt answer: {:?})",
        sim.initial_authorization, sim.authorization_response
    );

    println!("\n📍 Requests ({})", blueprint.requests.len());
    if args.requests {
        for (i, request) in blueprint.requests.iter().enumerate() {
            let is_last = i == blueprint.requests.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            let mut line = format!(
                "{:?} {:?} ({:?}, needs {:?})",
                request.mode,
                request.accuracy,
                request.service,
                request.required_authorization()
            );
            if let Some(timeout) = request.timeout {
                line.push_str(&format!(", timeout {:?}", timeout));
            }
            if request.avoid_authorization_prompt {
                line.push_str(", no prompt");
            }
            println!("   {} {}", prefix, line);
        }
    }

    println!();
}
