//! Sensor backend error types

use thiserror::Error;

/// Errors raised inside a backend. They are logged and turned into
/// `connected = false` or a failed acquisition, never returned to callers
/// of [`crate::SensorBackend`].
#[derive(Debug, Error)]
pub enum SensorError {
    /// Serial device could not be opened or configured
    #[error("failed to open '{device}': {message}")]
    ConnectionFailed { device: String, message: String },

    /// Descriptor carries an unsupported number of control codes
    #[error("sensor '{sensor_id}' has {count} control codes, expected 1 or 2")]
    ControlCodes { sensor_id: String, count: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SensorError {
    pub fn connection_failed(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            device: device.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SensorError>;
