//! Sensor data types
//!
//! A descriptor is created once per channel when a backend is built and then
//! shared read-only; readings are ephemeral and carry both the raw sample and
//! its translation into engineering units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::SensorId;

/// Static description of one sensor channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    pub id: SensorId,
    /// Display unit, e.g. `rpm`, `mbar`, `deg C.`
    pub unit: String,
    pub description: String,
    /// Minimum time between two hardware acquisitions
    pub refresh_interval: Duration,
    pub min_value: f64,
    pub max_value: f64,
    /// ECU request bytes; two codes are combined big-endian
    #[serde(default)]
    pub control_codes: Vec<u8>,
}

impl SensorDescriptor {
    pub fn new(id: &str, unit: &str, refresh_secs: f64) -> Self {
        Self {
            id: SensorId::from(id),
            unit: unit.to_string(),
            description: String::new(),
            refresh_interval: Duration::from_secs_f64(refresh_secs),
            min_value: 0.0,
            max_value: 0.0,
            control_codes: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_range(mut self, min_value: f64, max_value: f64) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    pub fn with_codes(mut self, codes: &[u8]) -> Self {
        self.control_codes = codes.to_vec();
        self
    }

    /// Freeze into the shared form handed to channels
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Unit-less value as read from a link, before translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// One or two protocol bytes
    Int(u32),
    Float(f64),
    /// Line-oriented ASCII input
    Text(String),
    /// Discrete input pins
    Pins([bool; 4]),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Int(v) => write!(f, "{v}"),
            RawValue::Float(v) => write!(f, "{v}"),
            RawValue::Text(v) => f.write_str(v),
            RawValue::Pins(pins) => {
                for pin in pins {
                    f.write_str(if *pin { "1" } else { "0" })?;
                }
                Ok(())
            }
        }
    }
}

/// Translated value in engineering units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    /// Symbolic readings such as a gear label
    Label(String),
}

impl SensorValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SensorValue::Number(v) => Some(*v),
            SensorValue::Label(_) => None,
        }
    }
}

impl From<f64> for SensorValue {
    fn from(v: f64) -> Self {
        SensorValue::Number(v)
    }
}

impl From<&str> for SensorValue {
    fn from(v: &str) -> Self {
        SensorValue::Label(v.to_string())
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Number(v) => write!(f, "{v}"),
            SensorValue::Label(v) => f.write_str(v),
        }
    }
}

/// Result of asking a backend for one sensor.
///
/// `raw` is `None` when the last acquisition failed; `value` is additionally
/// `None` when the raw sample could not be translated.
#[derive(Debug, Clone)]
pub struct SensorReading {
    pub descriptor: Arc<SensorDescriptor>,
    pub value: Option<SensorValue>,
    pub raw: Option<RawValue>,
}

impl SensorReading {
    pub fn id(&self) -> &SensorId {
        &self.descriptor.id
    }
}

/// Acquisition timing summary in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub last_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub average_ms: f64,
}

impl Performance {
    /// Aggregate durations, skipping failed acquisitions.
    ///
    /// Returns `None` when no acquisition succeeded.
    pub fn from_durations<'a, I>(durations: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Option<Duration>>,
    {
        let mut count = 0usize;
        let mut total = 0.0;
        let mut perf = Performance {
            last_ms: 0.0,
            min_ms: f64::MAX,
            max_ms: 0.0,
            average_ms: 0.0,
        };

        for duration in durations.into_iter().flatten() {
            let ms = duration.as_secs_f64() * 1000.0;
            count += 1;
            total += ms;
            perf.last_ms = ms;
            perf.min_ms = perf.min_ms.min(ms);
            perf.max_ms = perf.max_ms.max(ms);
        }

        if count == 0 {
            return None;
        }
        perf.average_ms = total / count as f64;
        Some(perf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let desc = SensorDescriptor::new("RPM", "rpm", 0.1)
            .with_description("Engine speed")
            .with_range(0.0, 7500.0)
            .with_codes(&[0x80, 0x81]);
        assert_eq!(desc.id, "RPM");
        assert_eq!(desc.refresh_interval, Duration::from_millis(100));
        assert_eq!(desc.control_codes, vec![0x80, 0x81]);
        assert_eq!(desc.max_value, 7500.0);
    }

    #[test]
    fn test_performance_skips_failures() {
        let samples = vec![
            Some(Duration::from_millis(4)),
            None,
            Some(Duration::from_millis(2)),
            None,
        ];
        let perf = Performance::from_durations(&samples).unwrap();
        assert_eq!(perf.last_ms, 2.0);
        assert_eq!(perf.min_ms, 2.0);
        assert_eq!(perf.max_ms, 4.0);
        assert_eq!(perf.average_ms, 3.0);
    }

    #[test]
    fn test_performance_without_success_is_none() {
        let samples: Vec<Option<Duration>> = vec![None, None];
        assert!(Performance::from_durations(&samples).is_none());
        assert!(Performance::from_durations(&Vec::new()).is_none());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(SensorValue::from(7500.0).to_string(), "7500");
        assert_eq!(SensorValue::from(14.7).to_string(), "14.7");
        assert_eq!(SensorValue::from("N").to_string(), "N");
        assert_eq!(RawValue::Pins([true, false, false, true]).to_string(), "1001");
    }
}
