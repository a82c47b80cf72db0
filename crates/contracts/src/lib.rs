//! # Contracts
//!
//! Shared data structures and traits used between the telemetry crates.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Refresh deadlines and heartbeats use a monotonic [`Clock`]
//! - Control messages carry a wall-clock creation timestamp for diagnostics
//! - The store's sample counter is the only ordering shared between loops

mod clock;
mod control;
mod error;
mod message;
mod sensor;
mod sensor_id;
mod settings;
mod store;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use control::*;
pub use error::*;
pub use message::{DataMessage, Outbound};
pub use sensor::*;
pub use sensor_id::SensorId;
pub use settings::*;
pub use store::{SensorStore, SharedSensorStore, StoredValue};
