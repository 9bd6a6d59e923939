//! Raw TCP transport, for serial-over-network bridges such as `ser2net` and for the
//! device emulator. Line parameters are the business of the bridge and are ignored.
use std::{
    io::{self, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

use super::{SerialTransport, read_within};
use crate::config::SerialSettings;

#[derive(Debug)]
pub struct TcpTransport {
    tcp: TcpStream,
}

impl TcpTransport {
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<TcpTransport> {
        let tcp = TcpStream::connect(addr)?;
        tcp.set_nodelay(true)?;
        Ok(TcpTransport { tcp })
    }

    pub fn from_stream(tcp: TcpStream) -> TcpTransport {
        TcpTransport { tcp }
    }
}

impl SerialTransport for TcpTransport {
    fn configure(&mut self, settings: &SerialSettings) -> io::Result<()> {
        log::debug!(
            "Ignoring line settings for TCP transport (baud_rate={})",
            settings.baud_rate
        );
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.tcp.write_all(bytes)
    }

    fn read_bytes(&mut self, count: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        read_within(
            &mut self.tcp,
            |tcp, remaining| tcp.set_read_timeout(Some(remaining)),
            count,
            timeout,
        )
    }

    fn close(self) -> io::Result<()> {
        match self.tcp.shutdown(Shutdown::Both) {
            // the peer may have closed first
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}
