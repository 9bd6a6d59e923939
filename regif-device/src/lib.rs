//! # Register Interface Device
//!
//! This crate implements the device (slave) side of the register interface protocol.
//! It is used to emulate an FPGA register file, for example to test host software
//! without hardware or to bridge the protocol to a simulation.
//!
//! ## Architecture
//!
//! - **[`RegisterDevice`] Trait**: the registers behind the protocol. Implementors
//!   only handle single word accesses.
//! - **[`RegisterFile`]**: an in-memory implementation backed by a sparse map.
//! - **[`server::Server`]**: decodes command frames from a stream, applies them to the
//!   device and sends replies to read commands.
//!
//! ## How It Works
//!
//! 1. The host sends a command frame (header, address, and for writes the words)
//! 2. For a write, every word is written to the same or to incrementing addresses
//! 3. For a read, the words are read the same way and sent back without a header
//!
//! The protocol has no way to report errors to the host. A malformed stream ends
//! the connection.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use regif_device::{RegisterFile, server::Server};
//!
//! let server = Server::new(RegisterFile::new(), Default::default());
//! server.listen("127.0.0.1:2543")?;
//! ```
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics. Enable logging to see:
//! - Client connections and disconnections
//! - Commands being processed
//! - Error conditions
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

pub mod server;

/// The registers that a device exposes through the protocol.
///
/// Bursts are broken down into single word accesses, in order, before they reach
/// the device.
pub trait RegisterDevice {
    /// Read the word at `address`.
    fn read(&self, address: u32) -> u32;

    /// Write `value` to `address`.
    fn write(&self, address: u32, value: u32);
}

impl<D: RegisterDevice + ?Sized> RegisterDevice for Arc<D> {
    fn read(&self, address: u32) -> u32 {
        (**self).read(address)
    }

    fn write(&self, address: u32, value: u32) {
        (**self).write(address, value)
    }
}

/// Registers held in memory. Registers that were never written read as zero.
#[derive(Debug, Default)]
pub struct RegisterFile {
    registers: Mutex<HashMap<u32, u32>>,
}

impl RegisterFile {
    pub fn new() -> RegisterFile {
        RegisterFile::default()
    }

    pub fn with_registers(registers: impl IntoIterator<Item = (u32, u32)>) -> RegisterFile {
        RegisterFile {
            registers: Mutex::new(registers.into_iter().collect()),
        }
    }

    /// The value of `address`, if it was ever written
    pub fn get(&self, address: u32) -> Option<u32> {
        self.registers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&address)
            .copied()
    }
}

impl RegisterDevice for RegisterFile {
    fn read(&self, address: u32) -> u32 {
        self.get(address).unwrap_or(0)
    }

    fn write(&self, address: u32, value: u32) {
        self.registers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address, value);
    }
}
