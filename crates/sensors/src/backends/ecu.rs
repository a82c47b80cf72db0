//! Cosworth ECU over the Pectel serial datastream.
//!
//! Each sensor is requested by writing one or two control codes; the ECU
//! answers one byte per code. Two-byte values are combined big-endian.

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    Clock, EcuType, PressureUnit, RawValue, SensorDescriptor, SensorReading, SensorValue,
};
use tracing::{debug, error, info, warn};

use crate::backend::{make_reading, SensorBackend};
use crate::channel::Acquisition;
use crate::channel_set::ChannelSet;
use crate::error::{Result, SensorError};
use crate::link::{LinkOpener, SerialLink};

const NAME: &str = "ecu";

/// mmHg → mbar
const MBAR_PER_MMHG: f64 = 0.750_061_561_302_64;
const PSI_FACTOR: f64 = 51.714_924_102_396;

struct EcuSensor {
    id: &'static str,
    unit: &'static str,
    refresh_secs: f64,
    codes: &'static [u8],
    min: f64,
    max: f64,
    description: &'static str,
    supported: &'static [EcuType],
}

const BOTH: &[EcuType] = &[EcuType::L8Pectel, EcuType::P8];

const ECU_SENSORS: &[EcuSensor] = &[
    EcuSensor {
        id: "RPM",
        unit: "rpm",
        refresh_secs: 0.1,
        codes: &[0x80, 0x81],
        min: 0.0,
        max: 7500.0,
        description: "Engine speed from crank sensor",
        supported: BOTH,
    },
    EcuSensor {
        id: "MAP",
        unit: "mbar",
        refresh_secs: 0.2,
        codes: &[0x82],
        min: -200.0,
        max: 2850.0,
        description: "Inlet manifold pressure in millibars",
        supported: BOTH,
    },
    EcuSensor {
        id: "IAT",
        unit: "deg C.",
        refresh_secs: 2.0,
        codes: &[0x83],
        min: 0.0,
        max: 60.0,
        description: "Inlet manifold air temperature in degrees Celsius",
        supported: BOTH,
    },
    EcuSensor {
        id: "ECT",
        unit: "deg C.",
        refresh_secs: 3.0,
        codes: &[0x84],
        min: 0.0,
        max: 120.0,
        description: "Engine coolant temperature in degrees Celsius",
        supported: BOTH,
    },
    EcuSensor {
        id: "TPS",
        unit: "deg",
        refresh_secs: 0.1,
        codes: &[0x85],
        min: -2.0,
        max: 90.0,
        description: "Throttle body opening in degrees",
        supported: BOTH,
    },
    EcuSensor {
        id: "IGNADV",
        unit: "deg",
        refresh_secs: 0.2,
        codes: &[0x86],
        min: 0.0,
        max: 40.0,
        description: "Ignition timing, degrees before top dead centre",
        supported: BOTH,
    },
    EcuSensor {
        id: "INJDUR",
        unit: "ms",
        refresh_secs: 0.1,
        codes: &[0x87, 0x88],
        min: 0.0,
        max: 5.0,
        description: "Injector pulse width duration, milliseconds",
        supported: BOTH,
    },
    EcuSensor {
        id: "BAT",
        unit: "v",
        refresh_secs: 4.0,
        codes: &[0x89],
        min: 0.0,
        max: 16.0,
        description: "Battery or supply circuit voltage",
        supported: BOTH,
    },
    EcuSensor {
        id: "AMAL",
        unit: "% duty",
        refresh_secs: 0.1,
        codes: &[0x90],
        min: 0.0,
        max: 100.0,
        description: "Boost control valve duty cycle",
        supported: BOTH,
    },
    EcuSensor {
        id: "CO",
        unit: "% trim",
        refresh_secs: 1.0,
        codes: &[0x8a],
        min: -50.0,
        max: 50.0,
        description: "Base fuel delivery trim pot",
        supported: BOTH,
    },
];

/// Translate a raw ECU value for `id`.
///
/// Unknown ids translate to `0` with a warning.
pub fn translate(id: &str, raw: u32, pressure: PressureUnit) -> f64 {
    let raw_f = f64::from(raw);
    match id {
        "RPM" => {
            if raw == 0 {
                0.0
            } else {
                (1_875_000.0 / raw_f).trunc()
            }
        }
        "INJDUR" => raw_f * 4.0 / 1000.0,
        "MAP" => {
            let mmhg = raw_f * 6.4161 + 45.63;
            match pressure {
                PressureUnit::Mmhg => mmhg,
                PressureUnit::Mbar => mmhg * MBAR_PER_MMHG,
                PressureUnit::Psi => mmhg * PSI_FACTOR,
            }
        }
        "TPS" => {
            if raw < 0x30 {
                raw_f * 0.1848 - 1.41
            } else {
                raw_f * 0.7058 - 90.0
            }
        }
        "BAT" => raw_f * 0.0628,
        "IGNADV" => raw_f / 4.0,
        "CO" => ((raw_f - 128.0) / 128.0) * 50.0,
        "IAT" | "ECT" | "AMAL" => raw_f,
        _ => {
            warn!(sensor_id = id, raw, "No translation for ECU sensor");
            0.0
        }
    }
}

pub struct EcuBackend {
    opener: Box<dyn LinkOpener>,
    link: Option<Box<dyn SerialLink>>,
    channels: ChannelSet,
    ecu_type: EcuType,
    pressure: PressureUnit,
}

impl EcuBackend {
    /// Open the ECU link. Never fails; check [`SensorBackend::is_connected`].
    pub fn new(
        opener: Box<dyn LinkOpener>,
        ecu_type: EcuType,
        pressure: PressureUnit,
        clock: Arc<dyn Clock>,
        capacity: usize,
    ) -> Self {
        info!(
            device = opener.device(),
            ecu_type = %ecu_type,
            pressure = pressure.label(),
            "Starting Cosworth ECU sensor backend"
        );
        let mut backend = Self {
            opener,
            link: None,
            channels: ChannelSet::new(NAME, clock, capacity),
            ecu_type,
            pressure,
        };
        backend.connect();
        backend
    }

    fn connect(&mut self) {
        self.channels.clear();
        match self.opener.open() {
            Ok(link) => {
                self.link = Some(link);
                self.register_sensors();
                info!(
                    device = self.opener.device(),
                    sensors = self.channels.len(),
                    "Cosworth ECU connected"
                );
            }
            Err(e) => {
                self.link = None;
                error!(device = self.opener.device(), error = %e, "Cosworth ECU connection error");
            }
        }
    }

    fn register_sensors(&mut self) {
        for sensor in ECU_SENSORS {
            if !sensor.supported.contains(&self.ecu_type) {
                debug!(sensor_id = sensor.id, ecu_type = %self.ecu_type, "Sensor not supported by ECU type");
                continue;
            }
            let unit = if sensor.id == "MAP" {
                self.pressure.label()
            } else {
                sensor.unit
            };
            let descriptor = SensorDescriptor::new(sensor.id, unit, sensor.refresh_secs)
                .with_description(sensor.description)
                .with_range(sensor.min, sensor.max)
                .with_codes(sensor.codes);
            self.channels.insert(descriptor.shared());
        }
    }
}

/// Request one sensor from the ECU
fn request(link: &mut dyn SerialLink, descriptor: &SensorDescriptor) -> Result<u32> {
    let codes = &descriptor.control_codes;
    if codes.is_empty() || codes.len() > 2 {
        return Err(SensorError::ControlCodes {
            sensor_id: descriptor.id.to_string(),
            count: codes.len(),
        });
    }

    let mut value: u32 = 0;
    for &code in codes {
        link.write_all(&[code])?;
        let mut byte = [0u8; 1];
        link.read_exact(&mut byte)?;
        value = (value << 8) | u32::from(byte[0]);
    }
    Ok(value)
}

fn acquire(link: Option<&mut Box<dyn SerialLink>>, descriptor: &SensorDescriptor) -> Acquisition {
    let Some(link) = link else {
        debug!(sensor_id = %descriptor.id, "ECU link is not open");
        return None;
    };
    let start = Instant::now();
    match request(&mut **link, descriptor) {
        Ok(value) => Some((RawValue::Int(value), start.elapsed())),
        Err(e) => {
            debug!(sensor_id = %descriptor.id, error = %e, "ECU read failed");
            None
        }
    }
}

impl SensorBackend for EcuBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    fn translate(&self, id: &str, raw: &RawValue) -> Option<SensorValue> {
        match raw {
            RawValue::Int(v) => Some(SensorValue::Number(translate(id, *v, self.pressure))),
            other => {
                warn!(sensor_id = id, raw = %other, "Unexpected raw value type from ECU");
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
        info!(device = self.opener.device(), "Reconnecting Cosworth ECU");
        self.close();
        self.connect();
        self.is_connected()
    }

    fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.flush() {
                debug!(error = %e, "Flush on close failed");
            }
            info!(device = self.opener.device(), "Cosworth ECU link closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_link::{MockLink, MockOpener};
    use contracts::ManualClock;

    fn backend(opener: &MockOpener) -> EcuBackend {
        EcuBackend::new(
            Box::new(opener.clone()),
            EcuType::L8Pectel,
            PressureUnit::Mbar,
            Arc::new(ManualClock::new()),
            16,
        )
    }

    #[test]
    fn test_rpm_translation() {
        assert_eq!(translate("RPM", 0, PressureUnit::Mbar), 0.0);
        assert_eq!(translate("RPM", 1_875_000, PressureUnit::Mbar), 1.0);
        assert_eq!(translate("RPM", 250, PressureUnit::Mbar), 7500.0);
        assert_eq!(translate("RPM", 0x0320, PressureUnit::Mbar), 2343.0);
    }

    #[test]
    fn test_tps_piecewise_boundary() {
        let low = translate("TPS", 0x2F, PressureUnit::Mbar);
        assert!((low - (47.0 * 0.1848 - 1.41)).abs() < 1e-9);
        let high = translate("TPS", 0x30, PressureUnit::Mbar);
        assert!((high - (48.0 * 0.7058 - 90.0)).abs() < 1e-9);
    }

    #[test]
    fn test_map_pressure_units() {
        let mmhg = translate("MAP", 100, PressureUnit::Mmhg);
        assert!((mmhg - (100.0 * 6.4161 + 45.63)).abs() < 1e-9);
        let mbar = translate("MAP", 100, PressureUnit::Mbar);
        assert!((mbar - mmhg * 0.75006156130264).abs() < 1e-9);
        let psi = translate("MAP", 100, PressureUnit::Psi);
        assert!((psi - mmhg * 51.714924102396).abs() < 1e-9);
    }

    #[test]
    fn test_simple_translations() {
        assert_eq!(translate("INJDUR", 1000, PressureUnit::Mbar), 4.0);
        assert_eq!(translate("IGNADV", 80, PressureUnit::Mbar), 20.0);
        assert!((translate("BAT", 200, PressureUnit::Mbar) - 12.56).abs() < 1e-9);
        assert_eq!(translate("CO", 128, PressureUnit::Mbar), 0.0);
        assert_eq!(translate("IAT", 42, PressureUnit::Mbar), 42.0);
        assert_eq!(translate("ECT", 90, PressureUnit::Mbar), 90.0);
        assert_eq!(translate("BOOST", 90, PressureUnit::Mbar), 0.0);
    }

    #[test]
    fn test_two_code_request_big_endian() {
        let link = MockLink::new();
        link.respond(0x80, 0x03);
        link.respond(0x81, 0x20);
        let opener = MockOpener::new(link.clone());
        let mut ecu = backend(&opener);

        let reading = ecu.sensor("RPM", true).unwrap();
        assert_eq!(reading.raw, Some(RawValue::Int(0x0320)));
        assert_eq!(reading.value, Some(SensorValue::Number(2343.0)));
        assert_eq!(link.written(), vec![0x80, 0x81]);
    }

    #[test]
    fn test_connected_registers_sorted_sensors() {
        let opener = MockOpener::new(MockLink::new());
        let ecu = backend(&opener);
        assert!(ecu.is_connected());
        let ids = ecu.available();
        assert_eq!(ids.len(), ECU_SENSORS.len());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ecu.descriptor("MAP").unwrap().unit, "mbar");
    }

    #[test]
    fn test_connection_failure_is_not_fatal() {
        let opener = MockOpener::unavailable();
        let mut ecu = backend(&opener);
        assert!(!ecu.is_connected());
        assert!(ecu.available().is_empty());
        assert!(ecu.sensor("RPM", true).is_none());
    }

    #[test]
    fn test_unknown_sensor_is_none() {
        let opener = MockOpener::new(MockLink::new());
        let mut ecu = backend(&opener);
        assert!(ecu.sensor("AFR", true).is_none());
        assert!(ecu.history("AFR").is_none());
        assert!(ecu.performance("AFR").is_none());
    }

    #[test]
    fn test_read_timeout_yields_no_value() {
        let opener = MockOpener::new(MockLink::new());
        let mut ecu = backend(&opener);
        let reading = ecu.sensor("BAT", true).unwrap();
        assert!(reading.raw.is_none());
        assert!(reading.value.is_none());
        assert_eq!(ecu.history("BAT").unwrap(), vec![None]);
    }

    #[test]
    fn test_broken_link_records_failed_sample() {
        let link = MockLink::new();
        link.respond(0x89, 120);
        let opener = MockOpener::new(link.clone());
        let mut ecu = backend(&opener);
        assert!(ecu.sensor("BAT", true).unwrap().raw.is_some());

        // Cable pulled mid-session: the write fails with BrokenPipe
        link.set_failing(true);
        let reading = ecu.sensor("BAT", true).unwrap();
        assert!(reading.raw.is_none());
        assert!(reading.value.is_none());
        assert!(ecu.is_connected());
        assert_eq!(ecu.history("BAT").unwrap().len(), 2);
        assert_eq!(ecu.history("BAT").unwrap()[1], None);

        link.set_failing(false);
        assert!(ecu.sensor("BAT", true).unwrap().raw.is_some());
    }

    #[test]
    fn test_reconnect_recovers() {
        let opener = MockOpener::unavailable();
        let mut ecu = backend(&opener);
        assert!(!ecu.is_connected());

        opener.set_available(true);
        assert!(ecu.reconnect());
        assert!(ecu.provides("RPM"));
        assert_eq!(opener.open_count(), 2);

        opener.set_available(false);
        assert!(!ecu.reconnect());
        assert!(ecu.available().is_empty());
    }

    #[test]
    fn test_translated_history() {
        let link = MockLink::new();
        link.respond(0x86, 40);
        let opener = MockOpener::new(link.clone());
        let mut ecu = backend(&opener);
        ecu.sensor("IGNADV", true);
        link.respond(0x86, 60);
        ecu.sensor("IGNADV", true);
        assert_eq!(
            ecu.history("IGNADV").unwrap(),
            vec![
                Some(SensorValue::Number(10.0)),
                Some(SensorValue::Number(15.0))
            ]
        );
    }
}
