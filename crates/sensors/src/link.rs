//! Serial link abstraction
//!
//! Backends talk to hardware through [`SerialLink`] and obtain links from a
//! [`LinkOpener`], so a reconnect is just another `open()` call and tests can
//! substitute scripted links.

use std::io::{self, Read, Write};

use contracts::SerialSettings;
use tracing::{debug, instrument};

use crate::error::{Result, SensorError};

/// Byte stream to a device
pub trait SerialLink: Read + Write + Send {}

impl<T: Read + Write + Send + ?Sized> SerialLink for T {}

pub trait LinkOpener: Send {
    /// Device path, for logs and status descriptions
    fn device(&self) -> &str;

    fn open(&self) -> Result<Box<dyn SerialLink>>;
}

/// Opens real serial ports with 8N1 framing and no flow control
#[derive(Debug, Clone)]
pub struct SerialPortOpener {
    settings: SerialSettings,
}

impl SerialPortOpener {
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings }
    }
}

impl LinkOpener for SerialPortOpener {
    fn device(&self) -> &str {
        &self.settings.device
    }

    #[instrument(
        name = "serial_open",
        skip(self),
        fields(device = %self.settings.device, baud = self.settings.baud)
    )]
    fn open(&self) -> Result<Box<dyn SerialLink>> {
        let port = serialport::new(&self.settings.device, self.settings.baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(self.settings.timeout)
            .open()
            .map_err(|e| SensorError::connection_failed(&self.settings.device, e.to_string()))?;

        debug!("Serial port opened");
        Ok(Box::new(port))
    }
}

/// Longest line accepted from a line-oriented device
const MAX_LINE_LEN: usize = 64;

/// Read one `\n`-terminated line, without the terminator
pub fn read_line(link: &mut dyn SerialLink) -> io::Result<String> {
    let mut line = Vec::with_capacity(16);
    let mut byte = [0u8; 1];
    loop {
        if link.read(&mut byte)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "link closed before end of line",
            ));
        }
        if byte[0] == b'\n' {
            break;
        }
        if line.len() >= MAX_LINE_LEN {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "line too long"));
        }
        line.push(byte[0]);
    }
    Ok(String::from_utf8_lossy(&line).trim_end_matches('\r').to_string())
}
