//! Channels owned by one backend, keyed by sensor id

use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::{Clock, Performance, RawValue, SensorDescriptor, SensorId};
use tracing::warn;

use crate::channel::{Acquisition, SensorChannel};

/// Result of reading one channel
#[derive(Debug, Clone)]
pub struct ChannelRead {
    pub descriptor: Arc<SensorDescriptor>,
    pub raw: Option<RawValue>,
    /// `false` when the cached sample was returned without acquiring
    pub refreshed: bool,
}

pub struct ChannelSet {
    backend: &'static str,
    clock: Arc<dyn Clock>,
    capacity: usize,
    channels: BTreeMap<SensorId, SensorChannel>,
}

impl ChannelSet {
    pub fn new(backend: &'static str, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        Self {
            backend,
            clock,
            capacity,
            channels: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, descriptor: Arc<SensorDescriptor>) {
        let channel = SensorChannel::new(descriptor, Arc::clone(&self.clock), self.capacity);
        self.channels.insert(channel.descriptor().id.clone(), channel);
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    /// Owned ids, sorted
    pub fn ids(&self) -> Vec<SensorId> {
        self.channels.keys().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.channels.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel(&self, id: &str) -> Option<&SensorChannel> {
        let channel = self.channels.get(id);
        if channel.is_none() {
            warn!(backend = self.backend, sensor_id = id, "Unsupported sensor id");
        }
        channel
    }

    pub fn channel_mut(&mut self, id: &str) -> Option<&mut SensorChannel> {
        let channel = self.channels.get_mut(id);
        if channel.is_none() {
            warn!(backend = self.backend, sensor_id = id, "Unsupported sensor id");
        }
        channel
    }

    pub fn descriptor(&self, id: &str) -> Option<Arc<SensorDescriptor>> {
        self.channel(id).map(|c| Arc::clone(c.descriptor()))
    }

    /// Read `id` through its channel; `None` when the id is not owned
    pub fn read<F>(
        &mut self,
        id: &str,
        force: bool,
        acquire: F,
    ) -> Option<ChannelRead>
    where
        F: FnOnce(&SensorDescriptor) -> Acquisition,
    {
        let channel = self.channel_mut(id)?;
        let (raw, refreshed) = channel.fetch(force, acquire);
        Some(ChannelRead {
            descriptor: Arc::clone(channel.descriptor()),
            raw,
            refreshed,
        })
    }

    pub fn history(&self, id: &str) -> Option<Vec<Option<RawValue>>> {
        self.channel(id).map(SensorChannel::history)
    }

    pub fn performance(&self, id: &str) -> Option<Performance> {
        self.channel(id).and_then(SensorChannel::performance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ManualClock;
    use std::time::Duration;

    fn set() -> ChannelSet {
        let mut set = ChannelSet::new("test", Arc::new(ManualClock::new()), 4);
        set.insert(SensorDescriptor::new("TPS", "deg", 0.1).shared());
        set.insert(SensorDescriptor::new("BAT", "v", 4.0).shared());
        set
    }

    #[test]
    fn test_ids_sorted() {
        assert_eq!(set().ids(), vec!["BAT", "TPS"]);
    }

    #[test]
    fn test_unknown_id_is_none() {
        let mut set = set();
        assert!(set.read("RPM", true, |_| None).is_none());
        assert!(set.history("RPM").is_none());
        assert!(set.performance("RPM").is_none());
        assert!(set.descriptor("RPM").is_none());
    }

    #[test]
    fn test_read_known_id() {
        let mut set = set();
        let read = set
            .read("BAT", true, |_| Some((RawValue::Int(200), Duration::from_millis(1))))
            .unwrap();
        assert_eq!(read.descriptor.unit, "v");
        assert_eq!(read.raw, Some(RawValue::Int(200)));
        assert!(read.refreshed);
        assert_eq!(set.history("BAT").unwrap().len(), 1);

        let cached = set.read("BAT", false, |_| None).unwrap();
        assert_eq!(cached.raw, Some(RawValue::Int(200)));
        assert!(!cached.refreshed);
    }
}
