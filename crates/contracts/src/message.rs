//! Outbound messages produced by the core for display consumers

use serde::{Deserialize, Serialize};

use crate::{ControlMessage, RawValue, SensorId, SensorValue};

/// One published sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataMessage {
    pub sensor_id: SensorId,
    pub value: SensorValue,
    pub raw: Option<RawValue>,
    /// Sample counter at the time of publication
    pub counter: u64,
    /// Duration of the last successful acquisition
    pub acquisition_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outbound {
    Data(DataMessage),
    Status(ControlMessage),
}
