//! Shared sensor-value store
//!
//! Written by the acquisition loop only, read by the logger and any display
//! consumer. Each slot holds an immutable record that is replaced with a
//! single atomic swap, so readers never block the writer.

use arc_swap::ArcSwapOption;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::{SensorId, SensorValue};

/// Latest published reading of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredValue {
    pub value: SensorValue,
    pub acquisition_ms: f64,
    pub counter: u64,
}

pub trait SensorStore: Send + Sync {
    /// All configured ids, sorted
    fn sensor_ids(&self) -> Vec<SensorId>;

    /// Latest value for `id`, `None` before the first reading
    fn get_data(&self, id: &str) -> Option<Arc<StoredValue>>;

    fn set_data(&self, id: &str, value: SensorValue, acquisition_ms: f64, counter: u64);

    /// Current global sample counter
    fn counter(&self) -> u64;

    /// Advance the sample counter by one and return the new value
    fn advance_counter(&self) -> u64;
}

/// Lock-free [`SensorStore`] with a fixed key set.
pub struct SharedSensorStore {
    slots: BTreeMap<SensorId, ArcSwapOption<StoredValue>>,
    counter: AtomicU64,
}

impl SharedSensorStore {
    pub fn new<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = SensorId>,
    {
        let slots = ids
            .into_iter()
            .map(|id| (id, ArcSwapOption::empty()))
            .collect();
        Self {
            slots,
            counter: AtomicU64::new(0),
        }
    }
}

impl SensorStore for SharedSensorStore {
    fn sensor_ids(&self) -> Vec<SensorId> {
        // BTreeMap keys are already sorted
        self.slots.keys().cloned().collect()
    }

    fn get_data(&self, id: &str) -> Option<Arc<StoredValue>> {
        self.slots.get(id).and_then(|slot| slot.load_full())
    }

    fn set_data(&self, id: &str, value: SensorValue, acquisition_ms: f64, counter: u64) {
        match self.slots.get(id) {
            Some(slot) => slot.store(Some(Arc::new(StoredValue {
                value,
                acquisition_ms,
                counter,
            }))),
            None => debug!(sensor_id = id, "Ignoring value for unconfigured sensor"),
        }
    }

    fn counter(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    fn advance_counter(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SharedSensorStore {
        SharedSensorStore::new(["TPS", "RPM", "AFR"].into_iter().map(SensorId::from))
    }

    #[test]
    fn test_ids_sorted() {
        let ids = store().sensor_ids();
        assert_eq!(ids, vec!["AFR", "RPM", "TPS"]);
    }

    #[test]
    fn test_set_and_get() {
        let store = store();
        assert!(store.get_data("RPM").is_none());

        store.set_data("RPM", SensorValue::from(3200.0), 1.5, 7);
        let stored = store.get_data("RPM").unwrap();
        assert_eq!(stored.value, SensorValue::from(3200.0));
        assert_eq!(stored.counter, 7);

        store.set_data("RPM", SensorValue::from(3300.0), 1.2, 8);
        assert_eq!(store.get_data("RPM").unwrap().counter, 8);
    }

    #[test]
    fn test_unknown_id_is_ignored() {
        let store = store();
        store.set_data("BOOST", SensorValue::from(1.0), 0.0, 0);
        assert!(store.get_data("BOOST").is_none());
        assert_eq!(store.sensor_ids().len(), 3);
    }

    #[test]
    fn test_counter_advances() {
        let store = store();
        assert_eq!(store.counter(), 0);
        assert_eq!(store.advance_counter(), 1);
        assert_eq!(store.advance_counter(), 2);
        assert_eq!(store.counter(), 2);
    }
}
