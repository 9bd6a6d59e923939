//! The byte level transports that carry command frames to the device.
//!
//! The client only needs a handful of primitives from a transport: write a frame,
//! read a fixed number of bytes within a timeout, and apply line settings. Finding
//! and opening ports is left to a [`PortProvider`].
use std::{
    io::{self, Read},
    time::{Duration, Instant},
};

use crate::config::SerialSettings;

pub mod mock;
#[cfg(feature = "serial")]
pub mod serial;
pub mod tcp;

/// A connection to a device that carries raw bytes.
pub trait SerialTransport {
    /// Apply line parameters. Transports without a notion of line parameters ignore them.
    fn configure(&mut self, settings: &SerialSettings) -> io::Result<()>;

    /// Write all of `bytes`. A frame is always passed in a single call.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read `count` bytes.
    ///
    /// If the bytes do not arrive within `timeout` this fails with
    /// [`io::ErrorKind::TimedOut`]. Bytes that did arrive in the meantime are discarded.
    fn read_bytes(&mut self, count: usize, timeout: Duration) -> io::Result<Vec<u8>>;

    /// Close the connection. Dropping a transport closes it as well.
    fn close(self) -> io::Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Discovers and opens transports by name.
pub trait PortProvider {
    type Transport: SerialTransport;

    /// Names of all ports that can currently be opened
    fn list_available(&self) -> io::Result<Vec<String>>;

    /// Open the port with the given name. Line parameters are applied separately.
    fn open(&self, port: &str) -> io::Result<Self::Transport>;
}

/// Fills a buffer of `count` bytes from `reader`, giving up once `timeout` has passed.
/// `set_timeout` is called before each read with the time that is left.
pub(crate) fn read_within<R: Read>(
    reader: &mut R,
    mut set_timeout: impl FnMut(&mut R, Duration) -> io::Result<()>,
    count: usize,
    timeout: Duration,
) -> io::Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut buf = vec![0u8; count];
    let mut filled = 0;
    while filled < count {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("received {} of {} bytes", filled, count),
            ));
        }
        set_timeout(reader, remaining)?;
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => filled += n,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_within_collects_requested_bytes() {
        let mut reader = Cursor::new(vec![1, 2, 3, 4, 5]);
        let bytes = read_within(&mut reader, |_, _| Ok(()), 4, Duration::from_secs(1)).unwrap();
        assert_eq!(bytes, [1, 2, 3, 4]);
    }

    #[test]
    fn read_within_reports_closed_stream() {
        let mut reader = Cursor::new(vec![1, 2, 3]);
        let err = read_within(&mut reader, |_, _| Ok(()), 4, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    struct Stalled;

    impl Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(Duration::from_millis(5));
            Err(io::ErrorKind::TimedOut.into())
        }
    }

    #[test]
    fn read_within_times_out() {
        let err =
            read_within(&mut Stalled, |_, _| Ok(()), 4, Duration::from_millis(20)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
