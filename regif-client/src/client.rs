use std::{
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use regif_protocol::{Command, Word, burst::Bursts};

use crate::{
    config::{Config, SerialSettings},
    error::Error,
    session,
    transport::{PortProvider, SerialTransport},
};

/// Blocking register client.
///
/// The client owns at most one transport. Every command frame and its reply are
/// exchanged while holding a lock over the transport, so the client can be shared
/// between threads (e.g. in an `Arc`) without frames and replies interleaving.
/// Multi-word transfers take the lock once per burst, so operations of other
/// threads may run between two bursts of a long transfer.
#[derive(Debug)]
pub struct RegisterClient<T> {
    transport: Mutex<Option<T>>,
    config: Config,
}

impl<T: SerialTransport> RegisterClient<T> {
    /// Creates a disconnected client
    pub fn new(config: Config) -> RegisterClient<T> {
        RegisterClient {
            transport: Mutex::new(None),
            config,
        }
    }

    /// Creates a client that talks over an already opened and configured transport
    pub fn with_transport(transport: T, config: Config) -> RegisterClient<T> {
        RegisterClient {
            transport: Mutex::new(Some(transport)),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connects to `port` using 8N1 at `baud_rate`.
    ///
    /// The port must be listed by the provider, otherwise it is not opened at all.
    /// If the client was connected before, the old transport is closed once the new
    /// one is ready.
    pub fn connect_with<P>(&self, provider: &P, port: &str, baud_rate: u32) -> Result<(), Error>
    where
        P: PortProvider<Transport = T>,
    {
        self.connect_with_settings(provider, port, &SerialSettings::new(baud_rate))
    }

    pub fn connect_with_settings<P>(
        &self,
        provider: &P,
        port: &str,
        settings: &SerialSettings,
    ) -> Result<(), Error>
    where
        P: PortProvider<Transport = T>,
    {
        let transport = session::open_port(provider, port, settings)?;
        let previous = self.lock()?.replace(transport);
        if let Some(previous) = previous {
            log::debug!("Closing previous transport");
            if let Err(err) = previous.close() {
                log::warn!("Failed to close previous transport: {}", err);
            }
        }
        Ok(())
    }

    /// Closes the transport. Does nothing if the client is not connected.
    pub fn disconnect(&self) -> Result<(), Error> {
        match self.lock()?.take() {
            Some(transport) => {
                log::debug!("Disconnecting");
                transport.close().map_err(Error::Transport)
            }
            None => Ok(()),
        }
    }

    /// Does not clear a poisoned lock, so the next operation still reports
    /// [`Error::Interrupted`].
    pub fn is_connected(&self) -> bool {
        match self.transport.lock() {
            Ok(transport) => transport.is_some(),
            Err(poisoned) => poisoned.get_ref().is_some(),
        }
    }

    /// Write a single word to `address`.
    pub fn write_one<W: Word>(&self, address: u32, word: W) -> Result<(), Error> {
        let command = Command::write(address, false, [word.to_raw()])?;
        self.exchange(&command, self.config.single_read_timeout).map(drop)
    }

    /// Read a single word from `address`, waiting up to the single read timeout.
    pub fn read_one<W: Word>(&self, address: u32) -> Result<W, Error> {
        let command = Command::read(address, false, 1)?;
        let words = self.exchange(&command, self.config.single_read_timeout)?;
        Ok(W::from_raw(words[0]))
    }

    /// Write `words` starting at `address`.
    ///
    /// With `increment`, word `i` goes to `address + i`; otherwise every word is
    /// written to `address`. The transfer is split into bursts of at most 64 words.
    /// The first failing burst aborts the transfer; bursts before it have already
    /// been written.
    pub fn write_burst<W: Word>(
        &self,
        address: u32,
        increment: bool,
        words: &[W],
    ) -> Result<(), Error> {
        for burst in Bursts::new(address, increment, words.len()) {
            log::debug!(
                "Write burst: address=0x{:08x}, words {:?}",
                burst.address,
                burst.range
            );
            let raw: Vec<u32> = words[burst.range].iter().map(|w| w.to_raw()).collect();
            let command = Command::write(burst.address, increment, raw)?;
            self.exchange(&command, self.config.burst_read_timeout)?;
        }
        Ok(())
    }

    /// Fill `buf` with words read starting at `address`, using the same addressing
    /// and splitting as [`write_burst`](Self::write_burst).
    ///
    /// On error the contents of `buf` are unspecified.
    pub fn read_burst<W: Word>(
        &self,
        address: u32,
        increment: bool,
        buf: &mut [W],
    ) -> Result<(), Error> {
        for burst in Bursts::new(address, increment, buf.len()) {
            log::debug!(
                "Read burst: address=0x{:08x}, words {:?}",
                burst.address,
                burst.range
            );
            let command = Command::read(burst.address, increment, burst.len())?;
            let words = self.exchange(&command, self.config.burst_read_timeout)?;
            for (dst, raw) in buf[burst.range].iter_mut().zip(words) {
                *dst = W::from_raw(raw);
            }
        }
        Ok(())
    }

    /// Read `len` words starting at `address`. Nothing is returned unless every burst succeeded.
    pub fn read_vec<W: Word>(
        &self,
        address: u32,
        increment: bool,
        len: usize,
    ) -> Result<Vec<W>, Error> {
        let mut buf = vec![W::from_raw(0); len];
        self.read_burst(address, increment, &mut buf)?;
        Ok(buf)
    }

    /// Takes the lock over the transport.
    ///
    /// A thread that panicked while holding the lock may have left a reply unread.
    /// The caller that finds the lock poisoned gets [`Error::Interrupted`]; the
    /// poison is cleared so that later calls proceed.
    fn lock(&self) -> Result<MutexGuard<'_, Option<T>>, Error> {
        self.transport.lock().or_else(|poisoned| {
            drop(poisoned);
            log::warn!("Transport lock was poisoned by a panicking caller");
            self.transport.clear_poison();
            Err(Error::Interrupted)
        })
    }

    fn exchange(&self, command: &Command, timeout: Duration) -> Result<Vec<u32>, Error> {
        let mut guard = self.lock()?;
        let transport = guard.as_mut().ok_or(Error::NotConnected)?;
        session::execute(transport, command, timeout)
    }
}

#[cfg(feature = "serial")]
impl RegisterClient<crate::transport::serial::SerialPortTransport> {
    /// Connects to a serial port of the host system using 8N1 at `baud_rate`.
    pub fn connect(&self, port: &str, baud_rate: u32) -> Result<(), Error> {
        self.connect_with(&crate::transport::serial::SystemPorts, port, baud_rate)
    }
}

impl<T: SerialTransport> Default for RegisterClient<T> {
    fn default() -> Self {
        RegisterClient::new(Config::default())
    }
}
