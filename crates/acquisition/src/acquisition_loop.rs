//! SensorAcquisitionLoop - polls the configured sensors and publishes readings
//!
//! One cycle:
//! 1. apply pending commands from the inbox
//! 2. read every configured sensor from the backend that answers it
//! 3. publish readings to the store and the outbound queue
//! 4. emit link heartbeats when due
//! 5. advance the sample counter if anything was published

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{Clock, Command, ControlMessage, DataMessage, SensorId, SensorStore, Settings};
use control_bus::{Inbox, OutboundSender};
use observability::{CycleStatsAggregator, CycleSummary};
use sensors::{DemoFactory, HardwareBackend, SensorBackend};
use tracing::{debug, info, instrument, trace};

use crate::slot::BackendSlot;
use crate::status::{demo_report, link_label, link_report};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Continue,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Polled ids, in publication order
    pub sensor_ids: Vec<SensorId>,
    pub poll_interval: Duration,
    pub idle_interval: Duration,
    pub heartbeat_interval: Duration,
    /// Wait after reopening links before checking them
    pub reconnect_settle: Duration,
    pub demo_enabled: bool,
}

impl AcquisitionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            sensor_ids: settings.sensor_ids(),
            poll_interval: settings.acquisition.poll_interval(),
            idle_interval: settings.acquisition.idle_interval(),
            heartbeat_interval: settings.acquisition.heartbeat_interval(),
            reconnect_settle: settings.acquisition.reconnect_settle(),
            demo_enabled: settings.demo.enabled,
        }
    }
}

pub struct SensorAcquisitionLoop {
    config: AcquisitionConfig,
    slots: Vec<BackendSlot>,
    demo: Option<Box<dyn SensorBackend>>,
    demo_factory: DemoFactory,
    store: Arc<dyn SensorStore>,
    outbound: OutboundSender,
    inbox: Inbox,
    clock: Arc<dyn Clock>,
    heartbeat_deadline: Instant,
    last_cycle_produced: bool,
    stats: CycleStatsAggregator,
}

impl SensorAcquisitionLoop {
    pub fn new(
        config: AcquisitionConfig,
        hardware: Vec<HardwareBackend>,
        demo_factory: DemoFactory,
        store: Arc<dyn SensorStore>,
        outbound: OutboundSender,
        inbox: Inbox,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let slots: Vec<BackendSlot> = hardware.into_iter().map(BackendSlot::new).collect();
        let demo = config.demo_enabled.then(|| demo_factory());
        let heartbeat_deadline = clock.now() + config.heartbeat_interval;
        observability::record_demo_mode(demo.is_some());

        info!(
            sensors = config.sensor_ids.len(),
            hardware = slots.len(),
            demo = demo.is_some(),
            "Sensor acquisition initialised"
        );

        Self {
            config,
            slots,
            demo,
            demo_factory,
            store,
            outbound,
            inbox,
            clock,
            heartbeat_deadline,
            last_cycle_produced: false,
            stats: CycleStatsAggregator::new(),
        }
    }

    pub fn demo_enabled(&self) -> bool {
        self.demo.is_some()
    }

    pub fn summary(&self) -> CycleSummary {
        self.stats.summary()
    }

    /// Time to wait before the next cycle
    pub fn sleep_interval(&self) -> Duration {
        if self.last_cycle_produced {
            self.config.poll_interval
        } else {
            self.config.idle_interval
        }
    }

    /// Force one read of every configured sensor; returns readings published
    #[instrument(name = "acquisition_prime", skip(self))]
    pub fn prime(&mut self) -> usize {
        let ids = self.config.sensor_ids.clone();
        let mut published = 0;
        for id in &ids {
            if let Some(message) = self.read(id, true) {
                self.publish(message);
                published += 1;
            }
        }
        info!(published, "Sensor retrieval starting");
        published
    }

    pub fn run_cycle(&mut self) -> CycleOutcome {
        let start = Instant::now();

        for message in self.inbox.drain() {
            if self.handle_command(&message) == CycleOutcome::Shutdown {
                self.close();
                return CycleOutcome::Shutdown;
            }
        }

        let ids = self.config.sensor_ids.clone();
        let mut published: Vec<SensorId> = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(message) = self.read(&id, false) {
                self.publish(message);
                published.push(id);
            }
        }

        if self.clock.now() >= self.heartbeat_deadline {
            self.heartbeat();
            self.heartbeat_deadline = self.clock.now() + self.config.heartbeat_interval;
        }

        if !published.is_empty() {
            let counter = self.store.advance_counter();
            observability::record_sample_counter(counter);
        }

        let elapsed = start.elapsed();
        observability::record_cycle(published.len(), elapsed);
        self.stats
            .update(published.iter().map(SensorId::as_str), elapsed);
        self.last_cycle_produced = !published.is_empty();
        CycleOutcome::Continue
    }

    fn handle_command(&mut self, message: &ControlMessage) -> CycleOutcome {
        debug!(command = ?message.command(), "Got a control message");
        match message.command() {
            Command::Shutdown => {
                info!("Shutting down sensor acquisition");
                return CycleOutcome::Shutdown;
            }
            Command::ToggleDemo => {
                self.toggle_demo();
            }
            Command::ResetLink => self.reset_links(),
            other => debug!(command = ?other, "Command not handled by sensor acquisition"),
        }
        CycleOutcome::Continue
    }

    /// Flip demo mode and confirm it with a status message; returns the new state
    pub fn toggle_demo(&mut self) -> bool {
        let enabled = if self.demo.take().is_some() {
            info!("Disable demo mode");
            false
        } else {
            info!("Enable demo mode");
            self.demo = Some((self.demo_factory)());
            true
        };
        self.outbound.status(demo_report(enabled));
        observability::record_demo_mode(enabled);
        enabled
    }

    /// Reopen every hardware link, wait for it to settle, then re-check it
    #[instrument(name = "acquisition_reset_links", skip(self), fields(backends = self.slots.len()))]
    pub fn reset_links(&mut self) {
        for slot in &mut self.slots {
            info!(backend = slot.backend.name(), "Resetting sensor backend connection");
            slot.backend.reconnect();
        }
        if !self.slots.is_empty() && !self.config.reconnect_settle.is_zero() {
            thread::sleep(self.config.reconnect_settle);
        }
        for slot in &mut self.slots {
            slot.refresh();
            if let Some(kind) = slot.link {
                observability::record_link_reconnect(link_label(kind), !slot.is_error());
            }
        }
    }

    /// Send one status per monitored hardware link
    pub fn heartbeat(&self) {
        for slot in &self.slots {
            let Some(kind) = slot.link else { continue };
            let ok = !slot.is_error();
            trace!(link = link_label(kind), ok, "Sending link status");
            observability::record_link_status(link_label(kind), ok);
            self.outbound.status(link_report(kind, ok));
        }
    }

    /// Close every backend
    pub fn close(&mut self) {
        for slot in &mut self.slots {
            slot.backend.close();
        }
        if let Some(demo) = self.demo.as_mut() {
            demo.close();
        }
    }

    /// The first hardware backend answering `id`, else demo when enabled
    fn source_for(&mut self, id: &str) -> Option<&mut dyn SensorBackend> {
        if let Some(idx) = self.slots.iter().position(|s| s.provides(id)) {
            return Some(self.slots[idx].backend.as_mut());
        }
        match self.demo.as_mut() {
            Some(demo) if demo.provides(id) => Some(demo.as_mut()),
            _ => None,
        }
    }

    fn read(&mut self, id: &SensorId, force: bool) -> Option<DataMessage> {
        let counter = self.store.counter();
        let backend = self.source_for(id)?;
        let reading = backend.sensor(id, force)?;
        let value = reading.value?;
        let acquisition_ms = backend
            .performance(id)
            .map(|p| p.last_ms)
            .unwrap_or(0.0);

        trace!(sensor_id = %id, value = %value, counter, "Received reading");
        Some(DataMessage {
            sensor_id: id.clone(),
            value,
            raw: reading.raw,
            counter,
            acquisition_ms,
        })
    }

    fn publish(&mut self, message: DataMessage) {
        self.store.set_data(
            &message.sensor_id,
            message.value.clone(),
            message.acquisition_ms,
            message.counter,
        );
        observability::record_reading(&message.sensor_id, message.acquisition_ms);
        self.outbound.data(message);
    }

    /// Prime, then cycle until shutdown
    pub fn run(mut self) -> CycleSummary {
        self.prime();
        loop {
            match self.run_cycle() {
                CycleOutcome::Shutdown => break,
                CycleOutcome::Continue => thread::sleep(self.sleep_interval()),
            }
        }
        let summary = self.summary();
        info!(
            cycles = summary.total_cycles,
            readings = summary.total_readings,
            "Sensor acquisition stopped"
        );
        summary
    }

    /// Run on a dedicated thread
    pub fn spawn(self) -> io::Result<JoinHandle<CycleSummary>> {
        thread::Builder::new()
            .name("sensor-io".to_string())
            .spawn(move || self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        Destination, ManualClock, Outbound, SensorValue, SharedSensorStore, StatusKind,
    };
    use control_bus::{outbound, ControlBus, ControlBusBuilder, OutboundReceiver};
    use sensors::{BackendFactory, MockLink, MockOpener};

    struct Harness {
        acquisition: SensorAcquisitionLoop,
        bus: ControlBus,
        rx: OutboundReceiver,
        store: Arc<SharedSensorStore>,
        clock: ManualClock,
    }

    fn config(ids: &[&str], demo: bool) -> AcquisitionConfig {
        AcquisitionConfig {
            sensor_ids: ids.iter().map(|id| SensorId::from(*id)).collect(),
            poll_interval: Duration::from_millis(50),
            idle_interval: Duration::from_millis(500),
            heartbeat_interval: Duration::from_secs(1),
            reconnect_settle: Duration::ZERO,
            demo_enabled: demo,
        }
    }

    fn harness(config: AcquisitionConfig, ecu: Option<MockOpener>) -> Harness {
        let clock = ManualClock::new();
        let mut settings = Settings::default();
        settings.ecu.enabled = ecu.is_some();
        settings.demo.steps = 4;
        let factory = BackendFactory::new(settings, Arc::new(clock.clone()));
        let hardware = factory.build_with_openers(
            ecu.map(|o| Box::new(o) as Box<dyn sensors::LinkOpener>),
            None,
            None,
        );

        let store = Arc::new(SharedSensorStore::new(config.sensor_ids.clone()));
        let (tx, rx) = outbound(256);
        let mut builder = ControlBusBuilder::new();
        let inbox = builder.register(Destination::SensorIo).unwrap();
        let bus = builder.build();

        let acquisition = SensorAcquisitionLoop::new(
            config,
            hardware,
            factory.demo_factory(),
            store.clone(),
            tx,
            inbox,
            Arc::new(clock.clone()),
        );
        Harness {
            acquisition,
            bus,
            rx,
            store,
            clock,
        }
    }

    fn statuses(rx: &OutboundReceiver) -> Vec<contracts::StatusReport> {
        rx.drain()
            .into_iter()
            .filter_map(|m| match m {
                Outbound::Status(msg) => msg.status_report().cloned(),
                Outbound::Data(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_demo_cycle_publishes_and_advances_counter() {
        let mut h = harness(config(&["RPM", "TPS", "BAT"], true), None);
        assert_eq!(h.acquisition.prime(), 3);
        assert_eq!(h.store.counter(), 0);

        assert_eq!(h.acquisition.run_cycle(), CycleOutcome::Continue);
        assert_eq!(h.store.counter(), 1);
        assert_eq!(h.acquisition.sleep_interval(), Duration::from_millis(50));

        let data: Vec<_> = h
            .rx
            .drain()
            .into_iter()
            .filter_map(|m| match m {
                Outbound::Data(d) => Some(d),
                Outbound::Status(_) => None,
            })
            .collect();
        // 3 primed + 3 cycled, in configured order
        assert_eq!(data.len(), 6);
        assert_eq!(data[3].sensor_id, "RPM");
        assert_eq!(data[5].sensor_id, "BAT");
        assert_eq!(data[3].counter, 0);
        assert!(h.store.get_data("TPS").is_some());
    }

    #[test]
    fn test_no_source_keeps_counter() {
        let mut h = harness(config(&["RPM"], false), None);
        assert_eq!(h.acquisition.prime(), 0);
        h.acquisition.run_cycle();
        assert_eq!(h.store.counter(), 0);
        assert!(h.store.get_data("RPM").is_none());
        assert_eq!(h.acquisition.sleep_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_hardware_answers_before_demo() {
        let link = MockLink::new();
        link.respond(0x89, 200);
        let mut h = harness(config(&["BAT", "AFR"], true), Some(MockOpener::new(link)));
        h.acquisition.prime();

        let bat = h.store.get_data("BAT").unwrap();
        assert!((bat.value.as_f64().unwrap() - 200.0 * 0.0628).abs() < 1e-9);
        // AFR is not an ECU sensor, demo answers it
        assert_eq!(h.store.get_data("AFR").unwrap().value, SensorValue::Number(0.0));
    }

    #[test]
    fn test_failed_hardware_read_does_not_fall_back_to_demo() {
        // ECU owns RPM but never answers
        let mut h = harness(
            config(&["RPM"], true),
            Some(MockOpener::new(MockLink::new())),
        );
        assert_eq!(h.acquisition.prime(), 0);
        h.acquisition.run_cycle();
        assert_eq!(h.store.counter(), 0);
    }

    #[test]
    fn test_toggle_demo_over_bus() {
        let mut h = harness(config(&["RPM"], true), None);
        h.bus.send(Command::ToggleDemo);
        h.acquisition.run_cycle();
        assert!(!h.acquisition.demo_enabled());
        assert_eq!(h.store.counter(), 0);

        let reports = statuses(&h.rx);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, StatusKind::DemoMode);
        assert_eq!(reports[0].description, "Demo mode is disabled.");

        h.bus.send(Command::ToggleDemo);
        h.acquisition.run_cycle();
        assert!(h.acquisition.demo_enabled());
        assert_eq!(statuses(&h.rx)[0].description, "Demo mode is enabled.");
    }

    #[test]
    fn test_heartbeat_reports_link_error_when_due() {
        let opener = MockOpener::unavailable();
        let mut h = harness(config(&["RPM"], false), Some(opener));

        h.acquisition.run_cycle();
        assert!(statuses(&h.rx).is_empty());

        h.clock.advance(Duration::from_secs(1));
        h.acquisition.run_cycle();
        let reports = statuses(&h.rx);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, StatusKind::EcuLink);
        assert!(!reports[0].ok);
        assert_eq!(reports[0].description, "Cosworth ECU connection error.");

        // Next heartbeat only after another interval
        h.acquisition.run_cycle();
        assert!(statuses(&h.rx).is_empty());
    }

    #[test]
    fn test_reset_link_recovers_backend() {
        let opener = MockOpener::unavailable();
        opener.link().respond(0x89, 100);
        let mut h = harness(config(&["BAT"], false), Some(opener.clone()));
        assert_eq!(h.acquisition.prime(), 0);

        opener.set_available(true);
        h.bus.send(Command::ResetLink);
        h.acquisition.run_cycle();
        assert_eq!(opener.open_count(), 2);

        // Past both the heartbeat and the BAT refresh interval
        h.clock.advance(Duration::from_secs(4));
        h.acquisition.run_cycle();
        let reports = statuses(&h.rx);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].ok);
        assert_eq!(reports[0].description, "Cosworth ECU connected okay.");
        assert!(h.store.get_data("BAT").is_some());
    }

    #[test]
    fn test_shutdown_stops_loop() {
        let mut h = harness(config(&["RPM"], true), None);
        h.bus.send(Command::Shutdown);
        assert_eq!(h.acquisition.run_cycle(), CycleOutcome::Shutdown);
    }

    #[test]
    fn test_ignores_other_components_commands() {
        let mut h = harness(config(&["RPM"], true), None);
        h.bus.send(Command::ToggleRecording);
        assert_eq!(h.acquisition.run_cycle(), CycleOutcome::Continue);
        assert!(h.acquisition.demo_enabled());
    }

    #[test]
    fn test_spawned_loop_stops_on_broadcast_shutdown() {
        let h = harness(config(&["RPM", "MAP"], true), None);
        let bus = h.bus.clone();
        let store = h.store.clone();
        let handle = h.acquisition.spawn().unwrap();

        bus.send(Command::Shutdown);
        let summary = handle.join().unwrap();
        assert!(store.get_data("MAP").is_some());
        assert_eq!(summary.total_cycles, store.counter());
    }
}
