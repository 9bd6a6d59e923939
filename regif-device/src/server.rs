use std::{
    io::{ErrorKind, Read, Write},
    net::{TcpListener, TcpStream, ToSocketAddrs},
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use regif_protocol::{Command, Direction, Reply, codec::CommandCodec, error::FrameError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::RegisterDevice;

#[derive(Debug, Clone)]
pub struct Config {
    pub read_write_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_write_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub struct Server<T: RegisterDevice> {
    device: T,
    config: Config,
}

/// Builder to create a [Server] instance and modify configuration options
///
/// # Example
///
/// ```
/// use regif_device::{RegisterFile, server::Builder};
/// use std::time::Duration;
///
/// let server = Builder::new()
///     .rw_timeout(Duration::from_secs(20))
///     .build(RegisterFile::new());
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the TCP read and write timeout
    pub fn rw_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = timeout;
        self
    }

    /// Build and return the server
    pub fn build<T: RegisterDevice>(self, device: T) -> Server<T> {
        Server::new(device, self.config)
    }
}

fn is_disconnect(err: &FrameError) -> bool {
    matches!(
        err,
        FrameError::Io(err) if matches!(
            err.kind(),
            ErrorKind::UnexpectedEof | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset
        )
    )
}

impl<T: RegisterDevice> Server<T> {
    pub fn new(device: T, config: Config) -> Server<T> {
        Server { device, config }
    }

    pub fn device(&self) -> &T {
        &self.device
    }

    /// Bind to `addr` and serve clients until the process ends.
    pub fn listen(&self, addr: impl ToSocketAddrs) -> Result<(), FrameError> {
        self.run(TcpListener::bind(addr)?)
    }

    /// Serve clients accepted on `listener`, one session at a time. Further
    /// clients wait in the accept backlog until the current session ends.
    pub fn run(&self, listener: TcpListener) -> Result<(), FrameError> {
        log::info!("Emulating device on {}", listener.local_addr()?);
        for tcp in listener.incoming() {
            let tcp = match tcp {
                Ok(tcp) => tcp,
                Err(err) => {
                    log::warn!("Accept failed: {}", err);
                    continue;
                }
            };
            let peer = tcp
                .peer_addr()
                .map_or_else(|_| "unknown peer".to_string(), |addr| addr.to_string());
            log::info!("Session with {} started", peer);
            if let Err(err) = self.handle_client(tcp) {
                log::error!("Session with {} failed: {}", peer, err);
            }
        }
        Ok(())
    }

    /// Serve a single TCP client until it disconnects or stays silent for longer
    /// than the configured timeout.
    pub fn handle_client(&self, mut tcp: TcpStream) -> Result<(), FrameError> {
        tcp.set_read_timeout(Some(self.config.read_write_timeout))?;
        tcp.set_write_timeout(Some(self.config.read_write_timeout))?;
        tcp.set_nodelay(true)?;
        match self.serve(&mut tcp) {
            Err(FrameError::Io(err))
                if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
            {
                log::error!("Client read timeout, closing connection");
                Ok(())
            }
            other => other,
        }
    }

    /// Process command frames from `stream` until the other side hangs up.
    pub fn serve(&self, stream: &mut (impl Read + Write)) -> Result<(), FrameError> {
        loop {
            let command = match Command::from_reader(stream) {
                Ok(command) => command,
                Err(err) if is_disconnect(&err) => break, // Client disconnected
                Err(other) => return Err(other),
            };
            if let Some(reply) = self.process(&command) {
                reply.write_to(stream)?;
                stream.flush()?;
            }
        }
        log::info!("Client disconnected");
        Ok(())
    }

    /// Serve command frames from an async stream until the other side hangs up.
    pub async fn serve_async<S>(&self, stream: S) -> Result<(), FrameError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(stream, CommandCodec);
        while let Some(command) = framed.next().await {
            let command = match command {
                Ok(command) => command,
                Err(err) if is_disconnect(&err) => break,
                Err(other) => return Err(other),
            };
            if let Some(reply) = self.process(&command) {
                framed.send(reply).await?;
            }
        }
        log::info!("Client disconnected");
        Ok(())
    }

    /// Apply a command to the device. Returns the reply for read commands.
    pub fn process(&self, command: &Command) -> Option<Reply> {
        log::debug!(
            "Received {} command: address=0x{:08x}, len={}, increment={}",
            command.direction(),
            command.address(),
            command.len(),
            command.increment()
        );
        match command.direction() {
            Direction::Write => {
                log::trace!("Write data: {:08x?}", command.words());
                for (address, word) in command.addresses().zip(command.words()) {
                    self.device.write(address, *word);
                }
                None
            }
            Direction::Read => {
                let words: Vec<u32> = command
                    .addresses()
                    .map(|address| self.device.read(address))
                    .collect();
                log::trace!("Read data: {:08x?}", words);
                Some(Reply::new(words))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, Cursor, Read, Write};

    use super::*;
    use crate::RegisterFile;

    /// An in-memory stream: reads from the given input and collects what is written.
    struct Loopback {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn serve_writes_then_reads() {
        let mut input = Vec::new();
        input.extend(Command::write(1, false, [10]).unwrap().to_bytes());
        input.extend(Command::write(0x20, true, [1, 2, 3]).unwrap().to_bytes());
        input.extend(Command::read(0x20, true, 3).unwrap().to_bytes());
        input.extend(Command::read(1, false, 2).unwrap().to_bytes());
        let mut stream = Loopback {
            input: Cursor::new(input),
            output: Vec::new(),
        };

        let server = Server::new(RegisterFile::new(), Config::default());
        server.serve(&mut stream).unwrap();

        assert_eq!(server.device().get(1), Some(10));
        let mut expected = Reply::new([1, 2, 3]).to_bytes();
        expected.extend(Reply::new([10, 10]).to_bytes());
        assert_eq!(stream.output, expected);
    }

    #[test]
    fn fixed_address_write_applies_words_in_order() {
        let server = Builder::new().build(RegisterFile::new());
        assert!(
            server
                .process(&Command::write(7, false, [1, 2, 3]).unwrap())
                .is_none()
        );
        assert_eq!(server.device().get(7), Some(3));
        assert_eq!(server.device().get(8), None);
    }

    #[test]
    fn unwritten_registers_read_as_zero() {
        let server = Server::new(RegisterFile::with_registers([(4, 9)]), Config::default());
        let reply = server.process(&Command::read(3, true, 2).unwrap()).unwrap();
        assert_eq!(reply.words(), [0, 9]);
    }

    #[test]
    fn listen_reports_bind_failure() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let server = Builder::new()
            .rw_timeout(Duration::from_millis(50))
            .build(RegisterFile::new());
        match server.listen(taken.local_addr().unwrap()) {
            Err(FrameError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::AddrInUse),
            other => panic!("expected a bind error, got {:?}", other),
        }
    }

    #[test]
    fn truncated_frame_ends_session() {
        let mut stream = Loopback {
            input: Cursor::new(vec![0x80, 0x01, 0x00]),
            output: Vec::new(),
        };
        let server = Server::new(RegisterFile::new(), Config::default());
        server.serve(&mut stream).unwrap();
        assert!(stream.output.is_empty());
    }

    #[tokio::test]
    async fn serve_async_over_duplex() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut host, device) = tokio::io::duplex(1024);
        let server = Server::new(RegisterFile::new(), Config::default());

        let host_side = async move {
            host.write_all(&Command::write(0x10, true, [5, 6]).unwrap().to_bytes())
                .await
                .unwrap();
            host.write_all(&Command::read(0x10, true, 2).unwrap().to_bytes())
                .await
                .unwrap();
            let mut reply = [0u8; 8];
            host.read_exact(&mut reply).await.unwrap();
            drop(host);
            reply
        };

        let (served, reply) = tokio::join!(server.serve_async(device), host_side);
        served.unwrap();
        assert_eq!(reply, [5, 0, 0, 0, 6, 0, 0, 0]);
    }

    #[tokio::test]
    async fn truncated_frame_ends_async_session() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut host, device) = tokio::io::duplex(64);
        let server = Server::new(RegisterFile::new(), Config::default());

        let host_side = async move {
            host.write_all(&[0x80, 0x01, 0x00]).await.unwrap();
            host.shutdown().await.unwrap();
            let mut rest = Vec::new();
            host.read_to_end(&mut rest).await.unwrap();
            rest
        };

        let (served, rest) = tokio::join!(server.serve_async(device), host_side);
        served.unwrap();
        assert!(rest.is_empty());
        assert_eq!(server.device().get(1), None);
    }
}
