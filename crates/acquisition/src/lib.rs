//! # Acquisition
//!
//! Sensor acquisition loop for the telemetry core.
//!
//! ## Responsibilities
//!
//! - Route every configured sensor id to the backend that answers it
//! - Publish readings to the shared store and the outbound queue
//! - Advance the sample counter once per productive cycle
//! - Apply demo toggle, link reset and shutdown commands
//! - Send periodic link heartbeats

pub mod acquisition_loop;
mod slot;
pub mod status;

pub use acquisition_loop::{AcquisitionConfig, CycleOutcome, SensorAcquisitionLoop};
pub use status::{demo_report, link_label, link_report};
