//! Per-sensor refresh timer and bounded sample history.
//!
//! Raw samples and acquisition durations live in two parallel `HeapRb`s of
//! the same capacity. Failed acquisitions are stored as `None` in both so the
//! histories stay aligned; once full, the oldest entry is evicted.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{Clock, Performance, RawValue, SensorDescriptor};
use ringbuf::{traits::*, HeapRb};

/// Outcome of one hardware read: the raw sample and how long it took.
pub type Acquisition = Option<(RawValue, Duration)>;

pub struct SensorChannel {
    descriptor: Arc<SensorDescriptor>,
    clock: Arc<dyn Clock>,
    refresh_interval: Duration,
    timer: Instant,
    raw_history: HeapRb<Option<RawValue>>,
    durations: HeapRb<Option<Duration>>,
    last: Option<RawValue>,
}

impl fmt::Debug for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorChannel")
            .field("id", &self.descriptor.id)
            .field("refresh_interval", &self.refresh_interval)
            .field("len", &self.raw_history.occupied_len())
            .field("last", &self.last)
            .finish()
    }
}

impl SensorChannel {
    /// Create a channel whose refresh timer starts now.
    ///
    /// `capacity` must be > 0.
    pub fn new(descriptor: Arc<SensorDescriptor>, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        let timer = clock.now();
        Self {
            refresh_interval: descriptor.refresh_interval,
            descriptor,
            clock,
            timer,
            raw_history: HeapRb::new(capacity),
            durations: HeapRb::new(capacity),
            last: None,
        }
    }

    pub fn descriptor(&self) -> &Arc<SensorDescriptor> {
        &self.descriptor
    }

    pub fn set_refresh_interval(&mut self, seconds: f64) {
        self.refresh_interval = Duration::from_secs_f64(seconds.max(0.0));
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn reset_timer(&mut self) {
        self.timer = self.clock.now();
    }

    pub fn needs_refresh(&self) -> bool {
        self.clock.now() >= self.timer + self.refresh_interval
    }

    /// Return the current raw value, acquiring a new one when forced or due.
    ///
    /// `acquire` is only called when a refresh happens; a failed acquisition
    /// is recorded and yields `None` rather than an error.
    pub fn get<F>(&mut self, force: bool, acquire: F) -> Option<RawValue>
    where
        F: FnOnce(&SensorDescriptor) -> Acquisition,
    {
        self.fetch(force, acquire).0
    }

    /// Like [`get`](Self::get), also reporting whether `acquire` ran
    pub fn fetch<F>(&mut self, force: bool, acquire: F) -> (Option<RawValue>, bool)
    where
        F: FnOnce(&SensorDescriptor) -> Acquisition,
    {
        let refreshed = force || self.needs_refresh();
        if refreshed {
            let (raw, elapsed) = match acquire(&self.descriptor) {
                Some((raw, elapsed)) => (Some(raw), Some(elapsed)),
                None => (None, None),
            };
            self.raw_history.push_overwrite(raw.clone());
            self.durations.push_overwrite(elapsed);
            self.last = raw;
            self.reset_timer();
        }
        (self.last.clone(), refreshed)
    }

    /// Most recent sample without touching hardware
    pub fn last_value(&self) -> Option<&RawValue> {
        self.last.as_ref()
    }

    /// Raw samples, oldest first
    pub fn history(&self) -> Vec<Option<RawValue>> {
        self.raw_history.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.raw_history.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.raw_history.capacity().get()
    }

    /// Timing summary over successful acquisitions
    pub fn performance(&self) -> Option<Performance> {
        Performance::from_durations(self.durations.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ManualClock;
    use std::cell::Cell;

    fn channel(clock: &ManualClock, capacity: usize) -> SensorChannel {
        let desc = SensorDescriptor::new("RPM", "rpm", 0.1).shared();
        SensorChannel::new(desc, Arc::new(clock.clone()), capacity)
    }

    fn sample(v: u32) -> Acquisition {
        Some((RawValue::Int(v), Duration::from_millis(2)))
    }

    #[test]
    fn test_cached_read_skips_acquisition() {
        let clock = ManualClock::new();
        let mut ch = channel(&clock, 8);
        let calls = Cell::new(0);

        assert_eq!(ch.get(true, |_| {
            calls.set(calls.get() + 1);
            sample(10)
        }), Some(RawValue::Int(10)));

        // Interval not elapsed: cached value, no acquisition
        let v = ch.get(false, |_| {
            calls.set(calls.get() + 1);
            sample(11)
        });
        assert_eq!(v, Some(RawValue::Int(10)));
        assert_eq!(calls.get(), 1);
        assert_eq!(ch.len(), 1);
    }

    #[test]
    fn test_fetch_reports_refresh() {
        let clock = ManualClock::new();
        let mut ch = channel(&clock, 8);
        assert_eq!(ch.fetch(false, |_| sample(1)), (None, false));
        assert_eq!(ch.fetch(true, |_| sample(2)), (Some(RawValue::Int(2)), true));
        assert_eq!(ch.fetch(false, |_| sample(3)), (Some(RawValue::Int(2)), false));

        clock.advance(Duration::from_millis(100));
        assert_eq!(ch.fetch(false, |_| None), (None, true));
        assert_eq!(ch.history(), vec![Some(RawValue::Int(2)), None]);
    }

    #[test]
    fn test_force_always_acquires() {
        let clock = ManualClock::new();
        let mut ch = channel(&clock, 8);
        ch.get(true, |_| sample(1));
        assert_eq!(ch.get(true, |_| sample(2)), Some(RawValue::Int(2)));
        assert_eq!(ch.len(), 2);
    }

    #[test]
    fn test_refresh_after_interval() {
        let clock = ManualClock::new();
        let mut ch = channel(&clock, 8);
        assert!(!ch.needs_refresh());

        clock.advance(Duration::from_millis(100));
        assert!(ch.needs_refresh());
        assert_eq!(ch.get(false, |_| sample(5)), Some(RawValue::Int(5)));
        assert!(!ch.needs_refresh());
    }

    #[test]
    fn test_failure_recorded_as_none() {
        let clock = ManualClock::new();
        let mut ch = channel(&clock, 8);
        ch.get(true, |_| sample(3));
        assert_eq!(ch.get(true, |_| None), None);
        assert_eq!(ch.history(), vec![Some(RawValue::Int(3)), None]);

        let perf = ch.performance().unwrap();
        assert_eq!(perf.last_ms, 2.0);
    }

    #[test]
    fn test_history_bounded_evicts_oldest() {
        let clock = ManualClock::new();
        let capacity = 4;
        let mut ch = channel(&clock, capacity);
        for v in 0..(capacity as u32 + 3) {
            ch.get(true, |_| sample(v));
        }
        assert_eq!(ch.len(), capacity);
        assert_eq!(ch.capacity(), capacity);
        let history = ch.history();
        assert_eq!(history.first(), Some(&Some(RawValue::Int(3))));
        assert_eq!(history.last(), Some(&Some(RawValue::Int(6))));
        // Durations evict in step with samples
        assert_eq!(ch.durations.occupied_len(), capacity);
    }

    #[test]
    fn test_single_slot_history_keeps_latest() {
        let clock = ManualClock::new();
        let mut ch = channel(&clock, 1);
        ch.get(true, |_| sample(1));
        ch.get(true, |_| None);
        ch.get(true, |_| sample(9));
        assert_eq!(ch.history(), vec![Some(RawValue::Int(9))]);
        assert_eq!(ch.performance().unwrap().last_ms, 2.0);
    }

    #[test]
    fn test_set_refresh_interval() {
        let clock = ManualClock::new();
        let mut ch = channel(&clock, 4);
        ch.set_refresh_interval(2.0);
        clock.advance(Duration::from_secs(1));
        assert!(!ch.needs_refresh());
        clock.advance(Duration::from_secs(1));
        assert!(ch.needs_refresh());
    }

    #[test]
    fn test_performance_none_without_success() {
        let clock = ManualClock::new();
        let mut ch = channel(&clock, 4);
        assert!(ch.performance().is_none());
        ch.get(true, |_| None);
        assert!(ch.performance().is_none());
    }
}
