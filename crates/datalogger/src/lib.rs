//! # Data Logger
//!
//! CSV recording of the shared sensor store.
//!
//! ## Responsibilities
//!
//! - Start and stop recordings on `toggle-recording`
//! - Pick the next `<prefix><NNN><suffix>` file in the log directory
//! - Write one row per sample counter change
//! - Send periodic logger status heartbeats

pub mod error;
pub mod file_name;
pub mod logger;

pub use error::{LoggerError, Result};
pub use file_name::next_log_file_name;
pub use logger::{DataLogger, LoggerConfig, LoggerOutcome};
