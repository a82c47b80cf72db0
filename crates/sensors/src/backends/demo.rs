//! Synthetic sensors cycling a triangle wave between each channel's range.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use contracts::{Clock, RawValue, SensorDescriptor, SensorId, SensorReading, SensorValue};
use tracing::{debug, info, warn};

use crate::backend::{make_reading, SensorBackend};
use crate::channel_set::ChannelSet;

const NAME: &str = "demo";

/// (id, unit, refresh s, min, max, description)
const DEMO_SENSORS: &[(&str, &str, f64, f64, f64, &str)] = &[
    ("AFR", "a.f.r", 0.1, 0.0, 18.0, "DEMO Air Fuel Ratio reading"),
    ("AMAL", "% duty", 0.2, 0.0, 100.0, "DEMO Duty cycle of boost control valve"),
    ("BAT", "v", 0.5, 0.0, 16.0, "DEMO Battery or supply circuit voltage"),
    ("CO", "% trim", 0.5, 0.0, 100.0, "DEMO Trim level of base fueling"),
    ("ECT", "deg C.", 0.5, 0.0, 120.0, "DEMO Engine coolant temperature in degrees Celsius"),
    ("IAT", "deg C.", 0.5, 0.0, 60.0, "DEMO Inlet manifold air temperature in degrees Celsius"),
    ("IGNADV", "deg", 0.2, 0.0, 40.0, "DEMO Ignition timing in degrees before top dead centre"),
    ("INJDUR", "ms", 0.1, 0.0, 5.0, "DEMO Injector pulse width duration in milliseconds"),
    ("MAP", "mbar", 0.2, -200.0, 2850.0, "DEMO Inlet manifold pressure"),
    ("RPM", "rpm", 0.1, 0.0, 7500.0, "DEMO engine speed"),
    ("TPS", "deg", 0.1, -2.0, 90.0, "DEMO Open angle of throttle plate in degrees"),
];

/// One rising then falling sweep: `2 * steps` values starting at `min`.
pub fn triangle_wave(min: f64, max: f64, steps: usize) -> Vec<f64> {
    let span = max - min;
    let n = steps as f64;
    let rising = (0..steps).map(|i| min + span * i as f64 / n);
    let falling = (0..steps).map(|i| max - span * i as f64 / n);
    rising.chain(falling).collect()
}

#[derive(Debug)]
struct Wave {
    data: Vec<f64>,
    idx: usize,
}

impl Wave {
    fn advance(&mut self) -> Option<f64> {
        let value = *self.data.get(self.idx)?;
        self.idx = (self.idx + 1) % self.data.len();
        Some(value)
    }
}

pub struct DemoBackend {
    channels: ChannelSet,
    waves: BTreeMap<SensorId, Wave>,
}

impl DemoBackend {
    pub fn new(steps: usize, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        info!(steps, "Starting demo sensor backend");
        let mut channels = ChannelSet::new(NAME, clock, capacity);
        let mut waves = BTreeMap::new();

        for &(id, unit, refresh, min, max, description) in DEMO_SENSORS {
            debug!(sensor_id = id, min, max, "Adding demo sensor");
            let descriptor = SensorDescriptor::new(id, unit, refresh)
                .with_description(description)
                .with_range(min, max)
                .shared();
            waves.insert(
                descriptor.id.clone(),
                Wave {
                    data: triangle_wave(min, max, steps),
                    idx: 0,
                },
            );
            channels.insert(descriptor);
        }

        Self { channels, waves }
    }
}

impl SensorBackend for DemoBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    fn translate(&self, id: &str, raw: &RawValue) -> Option<SensorValue> {
        match raw {
            RawValue::Float(v) => Some(SensorValue::Number(*v)),
            other => {
                warn!(sensor_id = id, raw = %other, "Unexpected raw value type from demo");
                None
            }
        }
    }

    fn sensor(&mut self, id: &str, force: bool) -> Option<SensorReading> {
        let waves = &mut self.waves;
        let read = self.channels.read(id, force, |desc| {
            let start = Instant::now();
            let value = waves.get_mut(desc.id.as_str())?.advance()?;
            Some((RawValue::Float(value), start.elapsed()))
        })?;
        Some(make_reading(self, read))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ManualClock;

    #[test]
    fn test_triangle_wave_shape() {
        let wave = triangle_wave(0.0, 8.0, 4);
        assert_eq!(wave, vec![0.0, 2.0, 4.0, 6.0, 8.0, 6.0, 4.0, 2.0]);

        let offset = triangle_wave(-2.0, 90.0, 64);
        assert_eq!(offset.len(), 128);
        assert_eq!(offset[0], -2.0);
        assert_eq!(offset[64], 90.0);
        assert!(offset.iter().all(|v| (-2.0..=90.0).contains(v)));
    }

    #[test]
    fn test_demo_period_is_two_steps() {
        let steps = 8;
        let mut demo = DemoBackend::new(steps, Arc::new(ManualClock::new()), 64);

        let values: Vec<f64> = (0..2 * steps * 2)
            .map(|_| demo.sensor("RPM", true).unwrap().value.unwrap().as_f64().unwrap())
            .collect();
        assert_eq!(&values[..2 * steps], &values[2 * steps..]);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[steps], 7500.0);
    }

    #[test]
    fn test_demo_lists_all_sensors_sorted() {
        let demo = DemoBackend::new(64, Arc::new(ManualClock::new()), 8);
        let ids = demo.available();
        assert_eq!(ids.len(), 11);
        assert_eq!(ids[0], "AFR");
        assert_eq!(ids[10], "TPS");
        assert_eq!(demo.descriptor("MAP").unwrap().min_value, -200.0);
    }

    #[test]
    fn test_cached_read_does_not_advance_wave() {
        let mut demo = DemoBackend::new(4, Arc::new(ManualClock::new()), 8);
        let first = demo.sensor("BAT", true).unwrap().value;
        let cached = demo.sensor("BAT", false).unwrap().value;
        assert_eq!(first, cached);
        let next = demo.sensor("BAT", true).unwrap().value;
        assert_eq!(next, Some(SensorValue::Number(4.0)));
    }

    #[test]
    fn test_unknown_id() {
        let mut demo = DemoBackend::new(4, Arc::new(ManualClock::new()), 8);
        assert!(demo.sensor("BOOM", true).is_none());
    }
}
