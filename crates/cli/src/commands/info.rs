//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::Settings;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    acquisition: AcquisitionInfo,
    links: Vec<LinkInfo>,
    demo: DemoInfo,
    logger: LoggerInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct AcquisitionInfo {
    poll_interval_ms: u64,
    idle_interval_ms: u64,
    heartbeat_interval_ms: u64,
    history_capacity: usize,
    sensor_count: usize,
}

#[derive(Serialize)]
struct LinkInfo {
    name: String,
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    baud: Option<u32>,
}

#[derive(Serialize)]
struct DemoInfo {
    enabled: bool,
    steps: usize,
}

#[derive(Serialize)]
struct LoggerInfo {
    enabled: bool,
    dir: String,
    pattern: String,
}

#[derive(Serialize)]
struct SensorInfo {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warn: Option<f64>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let settings = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&settings, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&settings, args);
    }

    Ok(())
}

fn build_links(settings: &Settings) -> Vec<LinkInfo> {
    vec![
        LinkInfo {
            name: format!("Cosworth ECU ({}, {})", settings.ecu.ecu_type, settings.ecu.pressure_unit.label()),
            enabled: settings.ecu.enabled,
            device: Some(settings.ecu.device.clone()),
            baud: Some(settings.ecu.baud),
        },
        LinkInfo {
            name: "AEM Wideband AFR".to_string(),
            enabled: settings.wideband.enabled,
            device: Some(settings.wideband.device.clone()),
            baud: Some(settings.wideband.baud),
        },
        LinkInfo {
            name: "Gear indicator".to_string(),
            enabled: settings.gear.enabled,
            device: None,
            baud: None,
        },
        LinkInfo {
            name: "Example".to_string(),
            enabled: settings.example.enabled,
            device: None,
            baud: None,
        },
    ]
}

fn build_config_info(settings: &Settings, args: &InfoArgs) -> ConfigInfo {
    let sensors = if args.sensors {
        settings
            .sensors
            .iter()
            .map(|s| SensorInfo {
                id: s.id.to_string(),
                min: s.min,
                max: s.max,
                warn: s.warn,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", settings.version),
        acquisition: AcquisitionInfo {
            poll_interval_ms: settings.acquisition.poll_interval_ms,
            idle_interval_ms: settings.acquisition.idle_interval_ms,
            heartbeat_interval_ms: settings.acquisition.heartbeat_interval_ms,
            history_capacity: settings.acquisition.history_capacity,
            sensor_count: settings.sensors.len(),
        },
        links: build_links(settings),
        demo: DemoInfo {
            enabled: settings.demo.enabled,
            steps: settings.demo.steps,
        },
        logger: LoggerInfo {
            enabled: settings.logger.enabled,
            dir: settings.logger.dir.display().to_string(),
            pattern: format!("{}NNN{}", settings.logger.prefix, settings.logger.suffix),
        },
        sensors,
    }
}

fn print_config_info(settings: &Settings, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               PyCosworth Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let acq = &settings.acquisition;
    println!("⏱  Acquisition");
    println!("   ├─ Version: {:?}", settings.version);
    println!("   ├─ Poll / idle interval: {} ms / {} ms", acq.poll_interval_ms, acq.idle_interval_ms);
    println!("   ├─ Heartbeat: {} ms", acq.heartbeat_interval_ms);
    println!("   └─ History capacity: {}", acq.history_capacity);

    let links = build_links(settings);
    println!("\n🔌 Links");
    for (i, link) in links.iter().enumerate() {
        let prefix = if i == links.len() - 1 { "└─" } else { "├─" };
        let state = if link.enabled { "enabled" } else { "disabled" };
        match (&link.device, link.baud) {
            (Some(device), Some(baud)) => {
                println!("   {} {}: {} ({} @ {} baud)", prefix, link.name, state, device, baud)
            }
            _ => println!("   {} {}: {}", prefix, link.name, state),
        }
    }

    println!("\n🎛  Demo mode");
    println!("   ├─ Enabled: {}", settings.demo.enabled);
    println!("   └─ Steps: {}", settings.demo.steps);

    let logger = &settings.logger;
    println!("\n💾 Logger");
    println!("   ├─ Enabled: {}", logger.enabled);
    println!("   ├─ Directory: {}", logger.dir.display());
    println!("   └─ Files: {}NNN{}", logger.prefix, logger.suffix);

    println!("\n📈 Sensors ({})", settings.sensors.len());
    if args.sensors {
        for (i, slot) in settings.sensors.iter().enumerate() {
            let prefix = if i == settings.sensors.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {} (min {}, max {}, warn {})",
                prefix,
                slot.id,
                fmt_limit(slot.min),
                fmt_limit(slot.max),
                fmt_limit(slot.warn)
            );
        }
    } else {
        let ids: Vec<&str> = settings.sensors.iter().map(|s| s.id.as_str()).collect();
        println!("   └─ {}", ids.join(", "));
    }

    println!();
}

fn fmt_limit(limit: Option<f64>) -> String {
    limit.map_or_else(|| "-".to_string(), |v| v.to_string())
}
