//! SensorBackend - common contract of every sensor source

use std::sync::Arc;

use contracts::{Performance, RawValue, SensorDescriptor, SensorId, SensorReading, SensorValue};
use metrics::counter;

use crate::channel_set::{ChannelRead, ChannelSet};

/// A named group of sensor channels behind one hardware (or synthetic) source.
///
/// Construction never fails: a backend whose link cannot be opened reports
/// `is_connected() == false` and owns no channels until a successful
/// [`reconnect`](SensorBackend::reconnect).
pub trait SensorBackend: Send {
    /// Short name used in logs and metrics
    fn name(&self) -> &'static str;

    fn channels(&self) -> &ChannelSet;

    /// Convert a raw sample into engineering units
    fn translate(&self, id: &str, raw: &RawValue) -> Option<SensorValue>;

    /// Latest reading for `id`, acquiring when forced or when the refresh
    /// interval has elapsed. `None` for ids this backend does not own.
    fn sensor(&mut self, id: &str, force: bool) -> Option<SensorReading>;

    fn is_connected(&self) -> bool {
        true
    }

    /// Reopen the link and rebuild the channel set
    fn reconnect(&mut self) -> bool {
        self.is_connected()
    }

    fn close(&mut self) {}

    /// Owned sensor ids, sorted
    fn available(&self) -> Vec<SensorId> {
        self.channels().ids()
    }

    fn provides(&self, id: &str) -> bool {
        self.channels().contains(id)
    }

    fn descriptor(&self, id: &str) -> Option<Arc<SensorDescriptor>> {
        self.channels().descriptor(id)
    }

    /// Translated history, oldest first; failed samples stay `None`
    fn history(&self, id: &str) -> Option<Vec<Option<SensorValue>>> {
        let raw = self.channels().history(id)?;
        Some(
            raw.iter()
                .map(|sample| sample.as_ref().and_then(|r| self.translate(id, r)))
                .collect(),
        )
    }

    fn performance(&self, id: &str) -> Option<Performance> {
        self.channels().performance(id)
    }
}

/// Assemble a reading from a channel read, translating when a sample exists
pub(crate) fn make_reading<B: SensorBackend + ?Sized>(backend: &B, read: ChannelRead) -> SensorReading {
    let ChannelRead {
        descriptor,
        raw,
        refreshed,
    } = read;
    let value = raw
        .as_ref()
        .and_then(|r| backend.translate(descriptor.id.as_str(), r));
    let outcome = read_outcome(refreshed, raw.is_some(), value.is_some());
    counter!(
        "pycosworth_sensor_reads_total",
        "backend" => backend.name(),
        "outcome" => outcome
    )
    .increment(1);
    SensorReading {
        descriptor,
        value,
        raw,
    }
}

/// Metric label for one sensor read
fn read_outcome(refreshed: bool, sampled: bool, translated: bool) -> &'static str {
    match (refreshed, sampled, translated) {
        (false, _, _) => "cached",
        (true, false, _) => "failed",
        (true, true, false) => "untranslated",
        (true, true, true) => "ok",
    }
}
