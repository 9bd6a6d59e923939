//! # Serial Port Transport
//!
//! Talks to the device through an operating system serial port (e.g. the USB-CDC
//! port of an Alchitry board) using the `serialport` crate.
//!
//! ## Example Usage
//!
//! ```ignore
//! use regif_client::transport::{PortProvider, serial::SystemPorts};
//!
//! for port in SystemPorts.list_available()? {
//!     println!("{}", port);
//! }
//! ```
use std::{
    io::{self, Write},
    time::Duration,
};

use serialport::SerialPort;

use super::{PortProvider, SerialTransport, read_within};
use crate::config::{DEFAULT_BAUD_RATE, DataBits, Parity, SerialSettings, StopBits};

/// Timeout used for the port until the first read sets its own
const OPEN_TIMEOUT: Duration = Duration::from_millis(100);

/// The serial ports of the host system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortProvider for SystemPorts {
    type Transport = SerialPortTransport;

    fn list_available(&self) -> io::Result<Vec<String>> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(|info| info.port_name).collect())
    }

    fn open(&self, port: &str) -> io::Result<SerialPortTransport> {
        log::debug!("Opening serial port {}", port);
        let port = serialport::new(port, DEFAULT_BAUD_RATE)
            .timeout(OPEN_TIMEOUT)
            .open()?;
        Ok(SerialPortTransport { port })
    }
}

/// An open serial port
pub struct SerialPortTransport {
    port: Box<dyn SerialPort>,
}

impl SerialPortTransport {
    pub fn new(port: Box<dyn SerialPort>) -> SerialPortTransport {
        SerialPortTransport { port }
    }

    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl std::fmt::Debug for SerialPortTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortTransport")
            .field("port", &self.port.name())
            .finish()
    }
}

impl SerialTransport for SerialPortTransport {
    fn configure(&mut self, settings: &SerialSettings) -> io::Result<()> {
        log::debug!(
            "Configuring {:?}: baud_rate={}, data_bits={:?}, stop_bits={:?}, parity={:?}",
            self.port.name(),
            settings.baud_rate,
            settings.data_bits,
            settings.stop_bits,
            settings.parity
        );
        self.port.set_baud_rate(settings.baud_rate)?;
        self.port.set_data_bits(match settings.data_bits {
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        })?;
        self.port.set_stop_bits(match settings.stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        })?;
        self.port.set_parity(match settings.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        })?;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read_bytes(&mut self, count: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        read_within(
            &mut self.port,
            |port, remaining| Ok(port.set_timeout(remaining)?),
            count,
            timeout,
        )
    }

    fn close(self) -> io::Result<()> {
        log::debug!("Closing serial port {:?}", self.port.name());
        drop(self.port);
        Ok(())
    }
}
