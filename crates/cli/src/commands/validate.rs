//! `validate` command implementation.

use anyhow::{Context, Result};
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
    sensor_count: usize,
    ecu_enabled: bool,
    wideband_enabled: bool,
    demo_enabled: bool,
    logger_enabled: bool,
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
        Ok(settings) => {
            let warnings = collect_warnings(&settings);
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
                    version: format!("{:?}", settings.version),
                    sensor_count: settings.sensors.len(),
                    ecu_enabled: settings.ecu.enabled,
                    wideband_enabled: settings.wideband.enabled,
                    demo_enabled: settings.demo.enabled,
                    logger_enabled: settings.logger.enabled,
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
fn collect_warnings(settings: &contracts::Settings) -> Vec<String> {
    let mut warnings = Vec::new();

    let hardware = settings.ecu.enabled
        || settings.wideband.enabled
        || settings.gear.enabled
        || settings.example.enabled;
    if !hardware && !settings.demo.enabled {
        warnings.push("No sensor backend enabled - no readings will be published".to_string());
    }

    if settings.sensors.is_empty() {
        warnings.push("Sensor list is empty - nothing will be polled".to_string());
    }

    if settings.ecu.enabled
        && settings.wideband.enabled
        && settings.ecu.device == settings.wideband.device
    {
        warnings.push(format!(
            "ECU and wideband share serial device '{}'",
            settings.ecu.device
        ));
    }

    for slot in &settings.sensors {
        if let (Some(max), Some(warn)) = (slot.max, slot.warn) {
            if warn > max {
                warnings.push(format!(
                    "Sensor '{}' warns above its display maximum ({} > {})",
                    slot.id, warn, max
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Sensors: {}", summary.sensor_count);
            println!("  ECU: {}", enabled(summary.ecu_enabled));
            println!("  Wideband: {}", enabled(summary.wideband_enabled));
            println!("  Demo mode: {}", enabled(summary.demo_enabled));
            println!("  Logger: {}", enabled(summary.logger_enabled));
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

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}
