//! # Sensors
//!
//! Sensor channels and the backends that feed them.
//!
//! Responsibilities:
//! - Per-sensor refresh timers and bounded sample history (`SensorChannel`)
//! - Raw value translation into engineering units
//! - Serial link handling for the Cosworth ECU and AEM wideband
//! - Synthetic demo data and the gear indicator
//! - Building backends from `Settings`
//!
//! Backends never return errors to callers: link failures surface as
//! `is_connected() == false` and failed reads as missing samples.

pub mod backend;
pub mod backends;
pub mod channel;
pub mod channel_set;
pub mod error;
pub mod factory;
pub mod link;
pub mod mock_link;

pub use backend::SensorBackend;
pub use backends::{
    decode_gear, triangle_wave, DemoBackend, EcuBackend, ExampleBackend, GearIndicatorBackend,
    PinReader, StaticPins, WidebandBackend,
};
pub use channel::{Acquisition, SensorChannel};
pub use channel_set::{ChannelRead, ChannelSet};
pub use error::{Result, SensorError};
pub use factory::{BackendFactory, DemoFactory, HardwareBackend};
pub use link::{read_line, LinkOpener, SerialLink, SerialPortOpener};
pub use mock_link::{MockLink, MockOpener};
