//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::RecorderBlueprint;
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
    output_path: Option<String>,
    image_extension: String,
    frame_limit: u64,
    episode_limit: u64,
    cameras: Vec<String>,
    traffic_light_radius: f64,
    speed_limit_radius: f64,
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
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(summarize(&blueprint)),
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

fn summarize(blueprint: &RecorderBlueprint) -> ConfigSummary {
    let recording = &blueprint.recording;
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        output_path: recording
            .output_path
            .as_ref()
            .map(|p| p.display().to_string()),
        image_extension: recording.image_extension.clone(),
        frame_limit: recording.frame_limit,
        episode_limit: recording.episode_limit,
        cameras: recording.cameras.clone(),
        traffic_light_radius: blueprint.proximity.traffic_light.radius,
        speed_limit_radius: blueprint.proximity.speed_limit.radius,
    }
}

/// Non-fatal configuration issues
fn collect_warnings(blueprint: &RecorderBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let recording = &blueprint.recording;

    if recording.output_path.is_none() {
        warnings.push("recording.output_path is not set - recording is disabled".to_string());
    }
    if recording.autostart && recording.output_path.is_none() {
        warnings.push("recording.autostart has no effect without an output path".to_string());
    }
    if recording.episode_limit != 0 && recording.frame_limit == 0 {
        warnings.push(
            "recording.episode_limit is set but frame_limit = 0 - episodes only end on request"
                .to_string(),
        );
    }
    let drive = &blueprint.drive_model;
    if !(drive.control_steer || drive.control_throttle || drive.control_brake) {
        warnings.push("drive_model controls nothing - policy output is ignored".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Output: {}",
                summary.output_path.as_deref().unwrap_or("(disabled)")
            );
            println!("  Image format: {}", summary.image_extension);
            println!("  Frame limit: {}", summary.frame_limit);
            println!("  Episode limit: {}", summary.episode_limit);
            println!("  Cameras: {}", summary.cameras.join(", "));
            println!(
                "  Radii: traffic light {} m, speed limit {} m",
                summary.traffic_light_radius, summary.speed_limit_radius
            );
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
