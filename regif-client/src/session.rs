//! The pieces shared by the blocking and the async client: opening a port and
//! running one command/reply exchange on a transport that is already exclusively held.
use std::time::Duration;

use regif_protocol::{Command, decode_reply};

use crate::{
    config::SerialSettings,
    error::{ConnectionError, Error},
    transport::{PortProvider, SerialTransport},
};

/// Checks that `port` is known to `provider`, opens it and applies `settings`.
/// A port whose settings cannot be applied is closed again.
pub(crate) fn open_port<P: PortProvider>(
    provider: &P,
    port: &str,
    settings: &SerialSettings,
) -> Result<P::Transport, ConnectionError> {
    if port.is_empty() {
        return Err(ConnectionError::EmptyPort);
    }
    let available = provider
        .list_available()
        .map_err(ConnectionError::Enumerate)?;
    if !available.iter().any(|name| name == port) {
        log::debug!("Port {} not in available ports {:?}", port, available);
        return Err(ConnectionError::UnknownPort(port.to_string()));
    }
    let mut transport = provider.open(port).map_err(|source| ConnectionError::Open {
        port: port.to_string(),
        source,
    })?;
    if let Err(source) = transport.configure(settings) {
        if let Err(err) = transport.close() {
            log::warn!("Failed to close {} after configuration error: {}", port, err);
        }
        return Err(ConnectionError::Configure {
            port: port.to_string(),
            source,
        });
    }
    log::debug!("Connected to {} at {} baud", port, settings.baud_rate);
    Ok(transport)
}

/// Sends `command` and, for reads, waits up to `timeout` for the reply.
/// Returns the words read, which is empty for writes.
pub(crate) fn execute<T: SerialTransport>(
    transport: &mut T,
    command: &Command,
    timeout: Duration,
) -> Result<Vec<u32>, Error> {
    let frame = command.to_bytes();
    log::trace!(
        "Sending {} frame: address=0x{:08x}, len={}, increment={}, bytes={:02x?}",
        command.direction(),
        command.address(),
        command.len(),
        command.increment(),
        frame
    );
    transport.write_bytes(&frame).map_err(Error::TransportWrite)?;

    let reply_len = command.reply_len();
    if reply_len == 0 {
        return Ok(Vec::new());
    }
    let reply = transport
        .read_bytes(reply_len, timeout)
        .map_err(|err| Error::from_read(err, timeout))?;
    log::trace!("Received reply: {:02x?}", reply);
    Ok(decode_reply(&reply, command.len())?)
}
