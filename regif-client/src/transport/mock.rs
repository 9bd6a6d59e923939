//! Mock transport implementations used in testing the client
//!
//! [`Mock`] behaves like a device with a sparse register file: write commands are
//! applied to the registers and read commands queue a reply. Every call is recorded
//! so tests can inspect the exact byte stream the client produced. Clones share
//! their state, so a test can keep a handle after passing the mock to a client.
use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::Duration,
};

use regif_protocol::{Command, Direction, Reply};

use super::{PortProvider, SerialTransport};
use crate::config::SerialSettings;

/// A single call made on the transport
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    Write(Vec<u8>),
    Read { count: usize, timeout: Duration },
}

#[derive(Debug, Default)]
struct State {
    registers: HashMap<u32, u32>,
    pending: VecDeque<u8>,
    events: Vec<Event>,
    settings: Option<SerialSettings>,
    fail_writes: bool,
    fail_configure: bool,
    fail_close: bool,
    truncate_reply: Option<usize>,
    short_reads: bool,
    write_delay: Duration,
    closed: bool,
}

impl State {
    fn process(&mut self, command: &Command) {
        match command.direction() {
            Direction::Write => {
                for (address, word) in command.addresses().zip(command.words()) {
                    self.registers.insert(address, *word);
                }
            }
            Direction::Read => {
                let words: Vec<u32> = command
                    .addresses()
                    .map(|address| self.registers.get(&address).copied().unwrap_or(0))
                    .collect();
                let mut bytes = Reply::new(words).to_bytes();
                if let Some(len) = self.truncate_reply.take() {
                    bytes.truncate(len);
                }
                self.pending.extend(bytes);
            }
        }
    }
}

/// A transport that emulates a device in memory, useful for testing
#[derive(Debug, Clone, Default)]
pub struct Mock {
    state: Arc<Mutex<State>>,
}

impl Mock {
    #[must_use]
    pub fn new() -> Mock {
        Mock::default()
    }

    /// Construct a mock whose registers are preloaded with `registers`
    #[must_use]
    pub fn with_registers(registers: impl IntoIterator<Item = (u32, u32)>) -> Mock {
        let mock = Mock::default();
        mock.state().registers.extend(registers);
        mock
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, address: u32) -> Option<u32> {
        self.state().registers.get(&address).copied()
    }

    /// All calls made so far, in order
    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    /// The frames written so far, in order
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Write(frame) => Some(frame.clone()),
                Event::Read { .. } => None,
            })
            .collect()
    }

    pub fn settings(&self) -> Option<SerialSettings> {
        self.state().settings
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Make every following write fail
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Make every following `configure` fail
    pub fn fail_configure(&self, fail: bool) {
        self.state().fail_configure = fail;
    }

    /// Make `close` report an error. The port counts as closed anyway.
    pub fn fail_close(&self, fail: bool) {
        self.state().fail_close = fail;
    }

    /// Only deliver the first `len` bytes of the next reply
    pub fn truncate_next_reply(&self, len: usize) {
        self.state().truncate_reply = Some(len);
    }

    /// Hand out whatever has arrived instead of timing out when a reply is incomplete
    pub fn short_reads(&self, short: bool) {
        self.state().short_reads = short;
    }

    /// Sleep inside every write, to widen the window for interleaving callers
    pub fn write_delay(&self, delay: Duration) {
        self.state().write_delay = delay;
    }
}

impl SerialTransport for Mock {
    fn configure(&mut self, settings: &SerialSettings) -> io::Result<()> {
        let mut state = self.state();
        if state.fail_configure {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unsupported line settings",
            ));
        }
        state.settings = Some(*settings);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        let delay = {
            let mut state = self.state();
            state.events.push(Event::Write(bytes.to_vec()));
            if state.fail_writes {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            state.write_delay
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        match Command::from_slice(bytes) {
            Some((command, len)) if len == bytes.len() => {
                self.state().process(&command);
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "write is not exactly one command frame",
            )),
        }
    }

    fn read_bytes(&mut self, count: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        let mut state = self.state();
        state.events.push(Event::Read { count, timeout });
        if state.pending.len() >= count {
            return Ok(state.pending.drain(..count).collect());
        }
        let partial: Vec<u8> = state.pending.drain(..).collect();
        if state.short_reads {
            Ok(partial)
        } else {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("received {} of {} bytes", partial.len(), count),
            ))
        }
    }

    fn close(self) -> io::Result<()> {
        let mut state = self.state();
        state.closed = true;
        if state.fail_close {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        Ok(())
    }
}

/// A fixed set of port names that all open the same [`Mock`]
#[derive(Debug, Clone, Default)]
pub struct MockPorts {
    ports: Vec<String>,
    mock: Mock,
    fail_open: bool,
    opened: Arc<Mutex<Vec<String>>>,
}

impl MockPorts {
    pub fn new(ports: impl IntoIterator<Item = impl Into<String>>, mock: Mock) -> MockPorts {
        MockPorts {
            ports: ports.into_iter().map(Into::into).collect(),
            mock,
            fail_open: false,
            opened: Arc::default(),
        }
    }

    /// Make opening any port fail
    #[must_use]
    pub fn failing_open(mut self) -> MockPorts {
        self.fail_open = true;
        self
    }

    /// The ports that were attempted to be opened, in order
    pub fn opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PortProvider for MockPorts {
    type Transport = Mock;

    fn list_available(&self) -> io::Result<Vec<String>> {
        Ok(self.ports.clone())
    }

    fn open(&self, port: &str) -> io::Result<Mock> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(port.to_string());
        if self.fail_open {
            return Err(io::ErrorKind::PermissionDenied.into());
        }
        Ok(self.mock.clone())
    }
}
