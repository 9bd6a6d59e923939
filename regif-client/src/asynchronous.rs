//! Async register client.
//!
//! Waiting for the transport is a plain `.await` on a [`tokio::sync::Mutex`], so a
//! caller that gives up while waiting (e.g. by dropping the future or losing a
//! `select!`) leaves nothing behind. Once the lock is held, the exchange runs on the
//! blocking thread pool and owns the lock until the reply is in or the read timed out,
//! even if the awaiting future is dropped in the meantime.
use std::{sync::Arc, time::Duration};

use regif_protocol::{Command, Word, burst::Bursts};
use tokio::sync::Mutex;

use crate::{
    config::{Config, SerialSettings},
    error::Error,
    session,
    transport::{PortProvider, SerialTransport},
};

/// Async counterpart of [`RegisterClient`](crate::RegisterClient).
/// Cloning the client shares the transport.
#[derive(Debug)]
pub struct AsyncRegisterClient<T> {
    transport: Arc<Mutex<Option<T>>>,
    config: Config,
}

impl<T> Clone for AsyncRegisterClient<T> {
    fn clone(&self) -> Self {
        AsyncRegisterClient {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }
}

impl<T: SerialTransport + Send + 'static> AsyncRegisterClient<T> {
    pub fn new(config: Config) -> AsyncRegisterClient<T> {
        AsyncRegisterClient {
            transport: Arc::new(Mutex::new(None)),
            config,
        }
    }

    pub fn with_transport(transport: T, config: Config) -> AsyncRegisterClient<T> {
        AsyncRegisterClient {
            transport: Arc::new(Mutex::new(Some(transport))),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connects to `port` using 8N1 at `baud_rate`. See
    /// [`RegisterClient::connect_with`](crate::RegisterClient::connect_with).
    pub async fn connect_with<P>(
        &self,
        provider: P,
        port: impl Into<String>,
        baud_rate: u32,
    ) -> Result<(), Error>
    where
        P: PortProvider<Transport = T> + Send + 'static,
    {
        let port = port.into();
        let settings = SerialSettings::new(baud_rate);
        let transport = tokio::task::spawn_blocking(move || {
            session::open_port(&provider, &port, &settings)
        })
        .await
        .map_err(|_| Error::Interrupted)??;
        let previous = self.transport.lock().await.replace(transport);
        if let Some(previous) = previous {
            log::debug!("Closing previous transport");
            if let Err(err) = previous.close() {
                log::warn!("Failed to close previous transport: {}", err);
            }
        }
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<(), Error> {
        match self.transport.lock().await.take() {
            Some(transport) => {
                log::debug!("Disconnecting");
                transport.close().map_err(Error::Transport)
            }
            None => Ok(()),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_some()
    }

    pub async fn write_one<W: Word>(&self, address: u32, word: W) -> Result<(), Error> {
        let command = Command::write(address, false, [word.to_raw()])?;
        self.exchange(command, self.config.single_read_timeout).await.map(drop)
    }

    pub async fn read_one<W: Word>(&self, address: u32) -> Result<W, Error> {
        let command = Command::read(address, false, 1)?;
        let words = self.exchange(command, self.config.single_read_timeout).await?;
        Ok(W::from_raw(words[0]))
    }

    pub async fn write_burst<W: Word>(
        &self,
        address: u32,
        increment: bool,
        words: &[W],
    ) -> Result<(), Error> {
        for burst in Bursts::new(address, increment, words.len()) {
            let raw: Vec<u32> = words[burst.range].iter().map(|w| w.to_raw()).collect();
            let command = Command::write(burst.address, increment, raw)?;
            self.exchange(command, self.config.burst_read_timeout).await?;
        }
        Ok(())
    }

    pub async fn read_vec<W: Word>(
        &self,
        address: u32,
        increment: bool,
        len: usize,
    ) -> Result<Vec<W>, Error> {
        let mut out = Vec::with_capacity(len);
        for burst in Bursts::new(address, increment, len) {
            let command = Command::read(burst.address, increment, burst.len())?;
            let words = self.exchange(command, self.config.burst_read_timeout).await?;
            out.extend(words.into_iter().map(W::from_raw));
        }
        Ok(out)
    }

    async fn exchange(&self, command: Command, timeout: Duration) -> Result<Vec<u32>, Error> {
        let mut guard = Arc::clone(&self.transport).lock_owned().await;
        tokio::task::spawn_blocking(move || {
            let transport = guard.as_mut().ok_or(Error::NotConnected)?;
            session::execute(transport, &command, timeout)
        })
        .await
        .map_err(|_| Error::Interrupted)?
    }
}
