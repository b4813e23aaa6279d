//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{AuthorizationState, LocatorBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    declared_modes: usize,
    request_count: usize,
    continuous_requests: usize,
    frequency_hz: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    declared_modes: blueprint.locator.declared_modes.len(),
                    request_count: blueprint.requests.len(),
                    continuous_requests: blueprint
                        .requests
                        .iter()
                        .filter(|r| r.is_continuous())
                        .count(),
                    frequency_hz: blueprint.simulator.frequency_hz,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &LocatorBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let sim = &blueprint.simulator;

    if blueprint.requests.is_empty() {
        warnings.push("No requests configured - `run` has nothing to do".to_string());
    }

    for (i, request) in blueprint.requests.iter().enumerate() {
        let required = request.required_authorization();

        if request.avoid_authorization_prompt && !sim.initial_authorization.satisfies(required) {
            warnings.push(format!(
                "Request #{} avoids prompting but {:?} does not cover {:?} - it fails immediately",
                i + 1,
                sim.initial_authorization,
                required
            ));
        }

        if !blueprint.locator.declared_modes.is_empty()
            && !blueprint.locator.declared_modes.contains(&required)
        {
            warnings.push(format!(
                "Request #{} needs {:?}, which is not in locator.declared_modes",
                i + 1,
                required
            ));
        }
    }

    if sim.authorization_response == AuthorizationState::Denied
        && sim.initial_authorization == AuthorizationState::NotDetermined
    {
        warnings.push(
            "simulator.authorization_response is denied - every prompting request fails".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Declared modes: {}", summary.declared_modes);
            println!(
                "  Requests: {} ({} continuous)",
                summary.request_count, summary.continuous_requests
            );
            println!("  Simulator frequency: {} Hz", summary.frequency_hz);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
