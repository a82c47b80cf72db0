//! Gear lever position from four discrete switch inputs.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use contracts::{Clock, RawValue, SensorDescriptor, SensorReading, SensorValue};
use tracing::{info, warn};

use crate::backend::{make_reading, SensorBackend};
use crate::channel_set::ChannelSet;

const NAME: &str = "gear";

/// Source of the four gear switch states, pin 1 first
pub trait PinReader: Send {
    fn read_pins(&self) -> [bool; 4];
}

/// Pin states held in memory; clones share the same state.
///
/// Stands in for GPIO scanning and is what tests drive.
#[derive(Debug, Clone, Default)]
pub struct StaticPins {
    mask: Arc<AtomicU8>,
}

impl StaticPins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, pins: [bool; 4]) {
        let mask = pins
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, &on)| if on { acc | (1 << i) } else { acc });
        self.mask.store(mask, Ordering::SeqCst);
    }
}

impl PinReader for StaticPins {
    fn read_pins(&self) -> [bool; 4] {
        let mask = self.mask.load(Ordering::SeqCst);
        [0, 1, 2, 3].map(|i| mask & (1 << i) != 0)
    }
}

/// Decode switch states into a gear label; unknown combinations are `E`
pub fn decode_gear(pins: [bool; 4]) -> &'static str {
    match pins {
        [true, true, false, false] => "1",
        [true, false, false, true] => "2",
        [false, true, false, false] => "3",
        [false, false, false, true] => "4",
        [false, true, true, false] => "5",
        [false, false, true, true] => "R",
        [false, false, false, false] => "N",
        _ => "E",
    }
}

pub struct GearIndicatorBackend {
    pins: Box<dyn PinReader>,
    channels: ChannelSet,
}

impl GearIndicatorBackend {
    pub fn new(pins: Box<dyn PinReader>, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        info!("Starting gear indicator sensor backend");
        let mut channels = ChannelSet::new(NAME, clock, capacity);
        channels.insert(
            SensorDescriptor::new("GEAR", "", 0.2)
                .with_description("Shows gear lever position")
                .with_range(0.0, 1.0)
                .shared(),
        );
        Self { pins, channels }
    }
}

impl SensorBackend for GearIndicatorBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    fn translate(&self, id: &str, raw: &RawValue) -> Option<SensorValue> {
        match raw {
            RawValue::Pins(pins) => Some(SensorValue::from(decode_gear(*pins))),
            other => {
                warn!(sensor_id = id, raw = %other, "Unexpected raw value type from gear indicator");
                None
            }
        }
    }

    fn sensor(&mut self, id: &str, force: bool) -> Option<SensorReading> {
        let pins = &self.pins;
        let read = self.channels.read(id, force, |_| {
            let start = Instant::now();
            let state = pins.read_pins();
            Some((RawValue::Pins(state), start.elapsed()))
        })?;
        Some(make_reading(self, read))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ManualClock;

    #[test]
    fn test_decode_table() {
        assert_eq!(decode_gear([true, true, false, false]), "1");
        assert_eq!(decode_gear([true, false, false, true]), "2");
        assert_eq!(decode_gear([false, true, false, false]), "3");
        assert_eq!(decode_gear([false, false, false, true]), "4");
        assert_eq!(decode_gear([false, true, true, false]), "5");
        assert_eq!(decode_gear([false, false, true, true]), "R");
        assert_eq!(decode_gear([false, false, false, false]), "N");
        assert_eq!(decode_gear([true, true, true, true]), "E");
        assert_eq!(decode_gear([true, false, false, false]), "E");
    }

    #[test]
    fn test_static_pins_roundtrip() {
        let pins = StaticPins::new();
        pins.set([false, true, true, false]);
        assert_eq!(pins.read_pins(), [false, true, true, false]);
    }

    #[test]
    fn test_gear_reading_follows_pins() {
        let pins = StaticPins::new();
        let mut gear =
            GearIndicatorBackend::new(Box::new(pins.clone()), Arc::new(ManualClock::new()), 4);

        let reading = gear.sensor("GEAR", true).unwrap();
        assert_eq!(reading.value, Some(SensorValue::from("N")));

        pins.set([false, false, true, true]);
        let reading = gear.sensor("GEAR", true).unwrap();
        assert_eq!(reading.value, Some(SensorValue::from("R")));
        assert_eq!(reading.raw, Some(RawValue::Pins([false, false, true, true])));
        assert!(gear.is_connected());
    }
}
