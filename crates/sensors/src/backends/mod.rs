pub mod demo;
pub mod ecu;
pub mod example;
pub mod gear;
pub mod wideband;

pub use demo::{triangle_wave, DemoBackend};
pub use ecu::EcuBackend;
pub use example::ExampleBackend;
pub use gear::{decode_gear, GearIndicatorBackend, PinReader, StaticPins};
pub use wideband::WidebandBackend;
