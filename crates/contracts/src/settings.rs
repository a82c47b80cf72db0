//! Settings - Config Loader output
//!
//! Describes the whole runtime: which sensors are polled and in what order,
//! which hardware links exist, demo mode and the data logger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::SensorId;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Polled sensors, in acquisition order
    #[serde(default = "default_sensors")]
    pub sensors: Vec<SensorSlot>,

    #[serde(default)]
    pub acquisition: AcquisitionSettings,

    #[serde(default)]
    pub ecu: EcuSettings,

    #[serde(default)]
    pub wideband: WidebandSettings,

    #[serde(default)]
    pub gear: GearSettings,

    #[serde(default)]
    pub example: ExampleSettings,

    #[serde(default)]
    pub demo: DemoSettings,

    #[serde(default)]
    pub logger: LoggerSettings,

    #[serde(default)]
    pub bus: BusSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            sensors: default_sensors(),
            acquisition: AcquisitionSettings::default(),
            ecu: EcuSettings::default(),
            wideband: WidebandSettings::default(),
            gear: GearSettings::default(),
            example: ExampleSettings::default(),
            demo: DemoSettings::default(),
            logger: LoggerSettings::default(),
            bus: BusSettings::default(),
        }
    }
}

impl Settings {
    /// Ids of all configured sensors, in acquisition order
    pub fn sensor_ids(&self) -> Vec<SensorId> {
        self.sensors.iter().map(|s| s.id.clone()).collect()
    }
}

/// One polled sensor and its display limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSlot {
    pub id: SensorId,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    /// Threshold above which displays warn the driver
    #[serde(default)]
    pub warn: Option<f64>,
}

impl SensorSlot {
    fn new(id: &str, min: f64, max: f64, warn: f64) -> Self {
        Self {
            id: SensorId::from(id),
            min: Some(min),
            max: Some(max),
            warn: Some(warn),
        }
    }
}

fn default_sensors() -> Vec<SensorSlot> {
    vec![
        SensorSlot::new("AFR", 0.0, 20.0, 15.0),
        SensorSlot::new("AMAL", 0.0, 100.0, 110.0),
        SensorSlot::new("BAT", 0.0, 14.0, 15.0),
        SensorSlot::new("CO", 0.0, 50.0, 100.0),
        SensorSlot::new("ECT", 0.0, 150.0, 110.0),
        SensorSlot::new("IAT", 0.0, 60.0, 50.0),
        SensorSlot::new("IGNADV", 0.0, 40.0, 36.0),
        SensorSlot::new("INJDUR", 0.0, 5.0, 20.0),
        SensorSlot::new("MAP", -350.0, 3000.0, 2500.0),
        SensorSlot::new("RPM", 0.0, 7500.0, 6000.0),
        SensorSlot::new("TPS", -0.3, 90.0, 100.0),
    ]
}

/// Acquisition loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionSettings {
    /// Sleep between cycles while sensors are producing data
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Sleep between cycles when no source answered
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    /// Interval between link status heartbeats
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Samples kept per sensor channel
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Wait after reopening links on `reset-link`
    #[serde(default = "default_reconnect_settle_ms")]
    pub reconnect_settle_ms: u64,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            idle_interval_ms: default_idle_interval_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            history_capacity: default_history_capacity(),
            reconnect_settle_ms: default_reconnect_settle_ms(),
        }
    }
}

impl AcquisitionSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn reconnect_settle(&self) -> Duration {
        Duration::from_millis(self.reconnect_settle_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_idle_interval_ms() -> u64 {
    500
}

fn default_heartbeat_interval_ms() -> u64 {
    1000
}

fn default_history_capacity() -> usize {
    256
}

fn default_reconnect_settle_ms() -> u64 {
    2000
}

/// Supported ECU sub-types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcuType {
    #[default]
    #[serde(rename = "L8 Pectel")]
    L8Pectel,
    #[serde(rename = "P8")]
    P8,
}

impl fmt::Display for EcuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcuType::L8Pectel => f.write_str("L8 Pectel"),
            EcuType::P8 => f.write_str("P8"),
        }
    }
}

/// Unit for manifold pressure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureUnit {
    Mmhg,
    #[default]
    Mbar,
    Psi,
}

impl PressureUnit {
    pub fn label(self) -> &'static str {
        match self {
            PressureUnit::Mmhg => "mmhg",
            PressureUnit::Mbar => "mbar",
            PressureUnit::Psi => "psi",
        }
    }
}

/// Serial link parameters shared by the ECU and wideband links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub device: String,
    pub baud: u32,
    pub timeout: Duration,
}

fn default_serial_timeout_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcuSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_ecu_device")]
    pub device: String,

    #[serde(default = "default_ecu_baud")]
    pub baud: u32,

    #[serde(default = "default_serial_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub ecu_type: EcuType,

    #[serde(default)]
    pub pressure_unit: PressureUnit,
}

impl Default for EcuSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            device: default_ecu_device(),
            baud: default_ecu_baud(),
            timeout_ms: default_serial_timeout_ms(),
            ecu_type: EcuType::default(),
            pressure_unit: PressureUnit::default(),
        }
    }
}

impl EcuSettings {
    pub fn serial(&self) -> SerialSettings {
        SerialSettings {
            device: self.device.clone(),
            baud: self.baud,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

fn default_ecu_device() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_ecu_baud() -> u32 {
    1952
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidebandSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_wideband_device")]
    pub device: String,

    #[serde(default = "default_wideband_baud")]
    pub baud: u32,

    #[serde(default = "default_serial_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for WidebandSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            device: default_wideband_device(),
            baud: default_wideband_baud(),
            timeout_ms: default_serial_timeout_ms(),
        }
    }
}

impl WidebandSettings {
    pub fn serial(&self) -> SerialSettings {
        SerialSettings {
            device: self.device.clone(),
            baud: self.baud,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

fn default_wideband_device() -> String {
    "/dev/ttyUSB1".to_string()
}

fn default_wideband_baud() -> u32 {
    9600
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GearSettings {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExampleSettings {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSettings {
    /// Start with demo mode on
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Steps between a sensor's min and max value
    #[serde(default = "default_demo_steps")]
    pub steps: usize,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            steps: default_demo_steps(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_demo_steps() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_log_prefix")]
    pub prefix: String,

    #[serde(default = "default_log_suffix")]
    pub suffix: String,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Sleep between cycles while recording
    #[serde(default = "default_active_interval_ms")]
    pub active_interval_ms: u64,

    /// Sleep between cycles while idle
    #[serde(default = "default_logger_idle_interval_ms")]
    pub idle_interval_ms: u64,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_log_dir(),
            prefix: default_log_prefix(),
            suffix: default_log_suffix(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            active_interval_ms: default_active_interval_ms(),
            idle_interval_ms: default_logger_idle_interval_ms(),
        }
    }
}

impl LoggerSettings {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn active_interval(&self) -> Duration {
        Duration::from_millis(self.active_interval_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_prefix() -> String {
    "pycosworth_".to_string()
}

fn default_log_suffix() -> String {
    ".csv".to_string()
}

fn default_active_interval_ms() -> u64 {
    20
}

fn default_logger_idle_interval_ms() -> u64 {
    1000
}

/// Outbound message queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSettings {
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

fn default_outbound_capacity() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sensor_list() {
        let settings = Settings::default();
        let ids = settings.sensor_ids();
        assert_eq!(ids.len(), 11);
        assert_eq!(ids[0], "AFR");
        assert_eq!(ids[10], "TPS");
    }

    #[test]
    fn test_serial_defaults() {
        let settings = Settings::default();
        let ecu = settings.ecu.serial();
        assert_eq!(ecu.baud, 1952);
        assert_eq!(ecu.device, "/dev/ttyUSB0");
        assert_eq!(ecu.timeout, Duration::from_millis(100));
        assert_eq!(settings.wideband.serial().baud, 9600);
    }

    #[test]
    fn test_ecu_type_names() {
        let json = serde_json::to_string(&EcuType::L8Pectel).unwrap();
        assert_eq!(json, "\"L8 Pectel\"");
        let parsed: EcuType = serde_json::from_str("\"P8\"").unwrap();
        assert_eq!(parsed, EcuType::P8);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.demo.enabled);
        assert_eq!(settings.demo.steps, 64);
        assert_eq!(settings.acquisition.history_capacity, 256);
        assert_eq!(settings.logger.prefix, "pycosworth_");
        assert!(!settings.ecu.enabled);
    }
}
