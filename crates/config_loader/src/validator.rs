//! Settings validation
//!
//! Rules:
//! - at least one sensor, ids unique
//! - sensor min < max when both are given
//! - acquisition / logger intervals > 0
//! - history capacity, demo steps and outbound capacity > 0
//! - logger file prefix and suffix non-empty
//! - enabled serial links name a device and a baud rate

use std::collections::HashSet;

use contracts::{ContractError, Settings};

/// Validate settings, returning the first error found
pub fn validate(settings: &Settings) -> Result<(), ContractError> {
    validate_sensors(settings)?;
    validate_acquisition(settings)?;
    validate_links(settings)?;
    validate_demo(settings)?;
    validate_logger(settings)?;
    validate_bus(settings)?;
    Ok(())
}

fn validate_sensors(settings: &Settings) -> Result<(), ContractError> {
    if settings.sensors.is_empty() {
        return Err(ContractError::config_validation(
            "sensors",
            "at least one sensor must be configured",
        ));
    }

    let mut seen = HashSet::new();
    for sensor in &settings.sensors {
        if sensor.id.is_empty() {
            return Err(ContractError::config_validation(
                "sensors[].id",
                "sensor id cannot be empty",
            ));
        }
        if !seen.insert(sensor.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("sensors[id={}]", sensor.id),
                "duplicate sensor id",
            ));
        }
        if let (Some(min), Some(max)) = (sensor.min, sensor.max) {
            if min >= max {
                return Err(ContractError::config_validation(
                    format!("sensors[id={}].min / max", sensor.id),
                    format!("min ({min}) must be < max ({max})"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_acquisition(settings: &Settings) -> Result<(), ContractError> {
    let acq = &settings.acquisition;
    let intervals = [
        ("acquisition.poll_interval_ms", acq.poll_interval_ms),
        ("acquisition.idle_interval_ms", acq.idle_interval_ms),
        ("acquisition.heartbeat_interval_ms", acq.heartbeat_interval_ms),
    ];
    for (field, value) in intervals {
        if value == 0 {
            return Err(ContractError::config_validation(field, "interval must be > 0"));
        }
    }

    if acq.history_capacity == 0 {
        return Err(ContractError::config_validation(
            "acquisition.history_capacity",
            "history capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_links(settings: &Settings) -> Result<(), ContractError> {
    let links = [
        ("ecu", settings.ecu.enabled, settings.ecu.serial()),
        ("wideband", settings.wideband.enabled, settings.wideband.serial()),
    ];
    for (name, enabled, serial) in links {
        if !enabled {
            continue;
        }
        if serial.device.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("{name}.device"),
                "device path cannot be empty",
            ));
        }
        if serial.baud == 0 {
            return Err(ContractError::config_validation(
                format!("{name}.baud"),
                "baud rate must be > 0",
            ));
        }
    }
    Ok(())
}

fn validate_demo(settings: &Settings) -> Result<(), ContractError> {
    if settings.demo.steps == 0 {
        return Err(ContractError::config_validation(
            "demo.steps",
            "demo steps must be > 0",
        ));
    }
    Ok(())
}

fn validate_logger(settings: &Settings) -> Result<(), ContractError> {
    let logger = &settings.logger;
    if logger.prefix.is_empty() {
        return Err(ContractError::config_validation(
            "logger.prefix",
            "log file prefix cannot be empty",
        ));
    }
    if logger.suffix.is_empty() {
        return Err(ContractError::config_validation(
            "logger.suffix",
            "log file suffix cannot be empty",
        ));
    }
    let intervals = [
        ("logger.heartbeat_interval_ms", logger.heartbeat_interval_ms),
        ("logger.active_interval_ms", logger.active_interval_ms),
        ("logger.idle_interval_ms", logger.idle_interval_ms),
    ];
    for (field, value) in intervals {
        if value == 0 {
            return Err(ContractError::config_validation(field, "interval must be > 0"));
        }
    }
    Ok(())
}

fn validate_bus(settings: &Settings) -> Result<(), ContractError> {
    if settings.bus.outbound_capacity == 0 {
        return Err(ContractError::config_validation(
            "bus.outbound_capacity",
            "outbound queue capacity must be > 0",
        ));
    }
    Ok(())
}
