//! Minimal backend to copy when adding a new sensor source.

use std::sync::Arc;
use std::time::Instant;

use contracts::{Clock, RawValue, SensorDescriptor, SensorReading, SensorValue};
use tracing::info;

use crate::backend::{make_reading, SensorBackend};
use crate::channel_set::ChannelSet;

const NAME: &str = "example";

pub struct ExampleBackend {
    channels: ChannelSet,
}

impl ExampleBackend {
    pub fn new(clock: Arc<dyn Clock>, capacity: usize) -> Self {
        info!("Starting example sensor backend");
        let mut channels = ChannelSet::new(NAME, clock, capacity);
        channels.insert(
            SensorDescriptor::new("BOOM", "booms", 1.5)
                .with_description("Example boom sensor")
                .with_range(0.0, 100.0)
                .shared(),
        );
        Self { channels }
    }
}

impl SensorBackend for ExampleBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    fn translate(&self, _id: &str, raw: &RawValue) -> Option<SensorValue> {
        match raw {
            RawValue::Int(v) => Some(SensorValue::Number(f64::from(*v))),
            _ => None,
        }
    }

    fn sensor(&mut self, id: &str, force: bool) -> Option<SensorReading> {
        let read = self.channels.read(id, force, |_| {
            // Real hardware access goes here
            let start = Instant::now();
            Some((RawValue::Int(1), start.elapsed()))
        })?;
        Some(make_reading(self, read))
    }
}
