//! AEM wideband O2 controller: one ASCII AFR reading per line.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use contracts::{Clock, RawValue, SensorDescriptor, SensorReading, SensorValue};
use tracing::{debug, error, info, warn};

use crate::backend::{make_reading, SensorBackend};
use crate::channel::Acquisition;
use crate::channel_set::ChannelSet;
use crate::link::{read_line, LinkOpener, SerialLink};

const NAME: &str = "wideband";

pub struct WidebandBackend {
    opener: Box<dyn LinkOpener>,
    link: Option<Box<dyn SerialLink>>,
    channels: ChannelSet,
}

impl WidebandBackend {
    pub fn new(opener: Box<dyn LinkOpener>, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        info!(device = opener.device(), "Starting AEM wideband AFR sensor backend");
        let mut backend = Self {
            opener,
            link: None,
            channels: ChannelSet::new(NAME, clock, capacity),
        };
        backend.connect();
        backend
    }

    fn connect(&mut self) {
        self.channels.clear();
        match self.opener.open() {
            Ok(link) => {
                self.link = Some(link);
                self.channels.insert(
                    SensorDescriptor::new("AFR", "afr", 0.1)
                        .with_description("AFR reading from AEM Wideband O2 sensor")
                        .with_range(0.0, 18.0)
                        .shared(),
                );
                info!(device = self.opener.device(), "AEM wideband connected");
            }
            Err(e) => {
                self.link = None;
                error!(device = self.opener.device(), error = %e, "AEM wideband connection error");
            }
        }
    }
}

fn acquire(link: Option<&mut Box<dyn SerialLink>>, descriptor: &SensorDescriptor) -> Acquisition {
    let Some(link) = link else {
        debug!(sensor_id = %descriptor.id, "Wideband link is not open");
        return None;
    };
    let start = Instant::now();
    match read_line(&mut **link) {
        Ok(line) => Some((RawValue::Text(line), start.elapsed())),
        Err(e) => {
            debug!(sensor_id = %descriptor.id, error = %e, "Wideband read failed");
            None
        }
    }
}

impl SensorBackend for WidebandBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    fn translate(&self, id: &str, raw: &RawValue) -> Option<SensorValue> {
        let RawValue::Text(text) = raw else {
            warn!(sensor_id = id, raw = %raw, "Unexpected raw value type from wideband");
            return None;
        };
        match text.trim().parse::<f64>() {
            Ok(afr) => Some(SensorValue::Number(afr)),
            Err(_) => {
                warn!(sensor_id = id, raw = %text, "Malformed wideband reading");
                None
            }
        }
    }

    fn sensor(&mut self, id: &str, force: bool) -> Option<SensorReading> {
        let link = self.link.as_mut();
        let read = self.channels.read(id, force, |desc| acquire(link, desc))?;
        Some(make_reading(self, read))
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    fn reconnect(&mut self) -> bool {
        info!(device = self.opener.device(), "Reconnecting AEM wideband");
        self.close();
        self.connect();
        self.is_connected()
    }

    fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.flush() {
                debug!(error = %e, "Flush on close failed");
            }
            info!(device = self.opener.device(), "AEM wideband link closed");
        }
    }
}
