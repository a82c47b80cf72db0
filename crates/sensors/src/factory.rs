//! BackendFactory - builds sensor backends from `Settings`
//!
//! Hardware backends come out in priority order: when two of them provide
//! the same sensor id, the earlier one answers it.

use std::sync::Arc;

use contracts::{Clock, Settings, StatusKind};
use tracing::{info, instrument, warn};

use crate::backend::SensorBackend;
use crate::backends::{
    DemoBackend, EcuBackend, ExampleBackend, GearIndicatorBackend, PinReader, StaticPins,
    WidebandBackend,
};
use crate::link::{LinkOpener, SerialPortOpener};

/// A hardware backend and the link status it reports in heartbeats
pub struct HardwareBackend {
    pub backend: Box<dyn SensorBackend>,
    /// `Some` for serial links whose connectivity is monitored
    pub link: Option<StatusKind>,
}

impl HardwareBackend {
    pub fn monitored(backend: Box<dyn SensorBackend>, kind: StatusKind) -> Self {
        Self {
            backend,
            link: Some(kind),
        }
    }

    pub fn unmonitored(backend: Box<dyn SensorBackend>) -> Self {
        Self {
            backend,
            link: None,
        }
    }
}

/// Rebuilds the demo backend each time demo mode is switched on
pub type DemoFactory = Box<dyn Fn() -> Box<dyn SensorBackend> + Send>;

#[derive(Clone)]
pub struct BackendFactory {
    settings: Settings,
    clock: Arc<dyn Clock>,
}

impl BackendFactory {
    pub fn new(settings: Settings, clock: Arc<dyn Clock>) -> Self {
        Self { settings, clock }
    }

    fn capacity(&self) -> usize {
        self.settings.acquisition.history_capacity
    }

    /// Build every enabled hardware backend with real serial ports.
    ///
    /// `pins` feeds the gear indicator; without it the indicator reads neutral.
    #[instrument(name = "backend_factory_build_hardware", skip(self, pins))]
    pub fn build_hardware(&self, pins: Option<Box<dyn PinReader>>) -> Vec<HardwareBackend> {
        let ecu = self
            .settings
            .ecu
            .enabled
            .then(|| Box::new(SerialPortOpener::new(self.settings.ecu.serial())) as Box<dyn LinkOpener>);
        let wideband = self
            .settings
            .wideband
            .enabled
            .then(|| Box::new(SerialPortOpener::new(self.settings.wideband.serial())) as Box<dyn LinkOpener>);
        self.build_with_openers(ecu, wideband, pins)
    }

    /// Build hardware backends over the given link openers
    pub fn build_with_openers(
        &self,
        ecu: Option<Box<dyn LinkOpener>>,
        wideband: Option<Box<dyn LinkOpener>>,
        pins: Option<Box<dyn PinReader>>,
    ) -> Vec<HardwareBackend> {
        let mut backends = Vec::new();

        if let Some(opener) = ecu {
            let backend = EcuBackend::new(
                opener,
                self.settings.ecu.ecu_type,
                self.settings.ecu.pressure_unit,
                Arc::clone(&self.clock),
                self.capacity(),
            );
            backends.push(HardwareBackend::monitored(Box::new(backend), StatusKind::EcuLink));
        }

        if let Some(opener) = wideband {
            let backend = WidebandBackend::new(opener, Arc::clone(&self.clock), self.capacity());
            backends.push(HardwareBackend::monitored(
                Box::new(backend),
                StatusKind::WidebandLink,
            ));
        }

        if self.settings.gear.enabled {
            let pins = pins.unwrap_or_else(|| {
                warn!("No gear switch inputs wired, gear indicator will read neutral");
                Box::new(StaticPins::new())
            });
            let backend = GearIndicatorBackend::new(pins, Arc::clone(&self.clock), self.capacity());
            backends.push(HardwareBackend::unmonitored(Box::new(backend)));
        }

        if self.settings.example.enabled {
            let backend = ExampleBackend::new(Arc::clone(&self.clock), self.capacity());
            backends.push(HardwareBackend::unmonitored(Box::new(backend)));
        }

        info!(
            backends = backends.len(),
            connected = backends.iter().filter(|b| b.backend.is_connected()).count(),
            "Hardware sensor backends built"
        );
        backends
    }

    pub fn demo(&self) -> DemoBackend {
        DemoBackend::new(
            self.settings.demo.steps,
            Arc::clone(&self.clock),
            self.capacity(),
        )
    }

    pub fn demo_factory(&self) -> DemoFactory {
        let factory = self.clone();
        Box::new(move || Box::new(factory.demo()) as Box<dyn SensorBackend>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_link::{MockLink, MockOpener};
    use contracts::ManualClock;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.ecu.enabled = true;
        settings.wideband.enabled = true;
        settings.gear.enabled = true;
        settings.example.enabled = true;
        settings
    }

    #[test]
    fn test_build_order_and_monitoring() {
        let factory = BackendFactory::new(settings(), Arc::new(ManualClock::new()));
        let backends = factory.build_with_openers(
            Some(Box::new(MockOpener::new(MockLink::new()))),
            Some(Box::new(MockOpener::unavailable())),
            None,
        );

        let names: Vec<_> = backends.iter().map(|b| b.backend.name()).collect();
        assert_eq!(names, vec!["ecu", "wideband", "gear", "example"]);
        assert_eq!(backends[0].link, Some(StatusKind::EcuLink));
        assert_eq!(backends[1].link, Some(StatusKind::WidebandLink));
        assert!(backends[2].link.is_none());
        assert!(backends[0].backend.is_connected());
        assert!(!backends[1].backend.is_connected());
    }

    #[test]
    fn test_disabled_links_are_skipped() {
        let factory = BackendFactory::new(Settings::default(), Arc::new(ManualClock::new()));
        assert!(factory.build_with_openers(None, None, None).is_empty());
    }

    #[test]
    fn test_demo_factory_builds_fresh_backend() {
        let factory = BackendFactory::new(Settings::default(), Arc::new(ManualClock::new()));
        let build = factory.demo_factory();
        let mut first = build();
        first.sensor("RPM", true);
        first.sensor("RPM", true);
        let mut second = build();
        let reading = second.sensor("RPM", true).unwrap();
        assert_eq!(reading.value.and_then(|v| v.as_f64()), Some(0.0));
    }
}
