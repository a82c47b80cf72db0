//! Layered error definitions
//!
//! Categorized by source: config / link / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Link Errors =====
    /// Hardware link could not be opened or was lost
    #[error("link '{device}' error: {message}")]
    Link { device: String, message: String },

    /// Sensor id is not owned by the queried backend
    #[error("unknown sensor id '{sensor_id}'")]
    UnknownSensor { sensor_id: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create link error
    pub fn link(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Link {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn unknown_sensor(sensor_id: impl Into<String>) -> Self {
        Self::UnknownSensor {
            sensor_id: sensor_id.into(),
        }
    }
}
