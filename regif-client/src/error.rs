use std::{io, time::Duration};

use regif_protocol::error::FrameError;
use thiserror::Error;

/// Reasons why a connection could not be established.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("No port given")]
    EmptyPort,
    #[error("Port {0} is not available")]
    UnknownPort(String),
    #[error("Could not list available ports: {0}")]
    Enumerate(#[source] io::Error),
    #[error("Could not open port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },
    #[error("Could not configure port {port}: {source}")]
    Configure {
        port: String,
        #[source]
        source: io::Error,
    },
}

/// Errors returned by the register clients.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Connection failed: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Not connected")]
    NotConnected,
    #[error("Invalid burst length {0}")]
    InvalidBurst(usize),
    #[error("Failed to write frame: {0}")]
    TransportWrite(#[source] io::Error),
    #[error("Failed to read reply: {0}")]
    Transport(#[source] io::Error),
    #[error("No reply within {timeout:?}")]
    Timeout { timeout: Duration },
    #[error("Reply has {got} bytes, expected {expected}")]
    Framing { expected: usize, got: usize },
    #[error("Interrupted while waiting for the transport")]
    Interrupted,
}

/// Flat classification of an [`Error`], for callers that only need to branch on the kind.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    Connection,
    NotConnected,
    InvalidRequest,
    TransportWrite,
    Transport,
    Timeout,
    Framing,
    Interrupted,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection(_) => ErrorKind::Connection,
            Error::NotConnected => ErrorKind::NotConnected,
            Error::InvalidBurst(_) => ErrorKind::InvalidRequest,
            Error::TransportWrite(_) => ErrorKind::TransportWrite,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Framing { .. } => ErrorKind::Framing,
            Error::Interrupted => ErrorKind::Interrupted,
        }
    }

    /// Classifies a failed read. Serial ports report an expired timeout as `TimedOut`,
    /// sockets as `WouldBlock`.
    pub(crate) fn from_read(err: io::Error, timeout: Duration) -> Error {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout { timeout },
            _ => Error::Transport(err),
        }
    }
}

impl From<FrameError> for Error {
    fn from(value: FrameError) -> Self {
        match value {
            FrameError::InvalidBurstLength(len) => Error::InvalidBurst(len),
            FrameError::ReplyLength { expected, got } => Error::Framing { expected, got },
            FrameError::Io(err) => Error::Transport(err),
        }
    }
}

#[test]
fn read_errors_are_classified() {
    let timeout = Duration::from_millis(1000);
    let err = Error::from_read(io::Error::from(io::ErrorKind::TimedOut), timeout);
    assert_eq!(err.kind(), ErrorKind::Timeout);
    let err = Error::from_read(io::Error::from(io::ErrorKind::WouldBlock), timeout);
    assert_eq!(err.kind(), ErrorKind::Timeout);
    let err = Error::from_read(io::Error::from(io::ErrorKind::BrokenPipe), timeout);
    assert_eq!(err.kind(), ErrorKind::Transport);
}
