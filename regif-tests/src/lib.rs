//! Helpers shared by the integration tests.
use std::{
    net::{SocketAddr, TcpListener},
    thread::{self, JoinHandle},
    time::Duration,
};

use regif_client::{Config, RegisterClient, transport::tcp::TcpTransport};
use regif_device::{RegisterDevice, server::Builder};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Starts an emulated device that serves exactly one TCP connection.
pub fn spawn_device<T>(device: T) -> (SocketAddr, JoinHandle<()>)
where
    T: RegisterDevice + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind to an ephemeral port");
    let addr = listener.local_addr().expect("listener has an address");
    let handle = thread::spawn(move || {
        let server = Builder::new()
            .rw_timeout(Duration::from_secs(10))
            .build(device);
        let (tcp, peer) = listener.accept().expect("client connects");
        log::info!("Emulator serving {}", peer);
        if let Err(e) = server.handle_client(tcp) {
            log::error!("Emulator error: {}", e);
        }
    });
    (addr, handle)
}

/// Starts an emulated device that serves clients one after another for the rest of
/// the test process. Idle sessions are dropped after `rw_timeout`.
pub fn spawn_emulator<T>(device: T, rw_timeout: Duration) -> SocketAddr
where
    T: RegisterDevice + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind to an ephemeral port");
    let addr = listener.local_addr().expect("listener has an address");
    thread::spawn(move || {
        let server = Builder::new().rw_timeout(rw_timeout).build(device);
        if let Err(e) = server.run(listener) {
            log::error!("Emulator stopped: {}", e);
        }
    });
    addr
}

/// Starts a device that accepts a connection and never answers.
pub fn spawn_silent_device(hold_for: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind to an ephemeral port");
    let addr = listener.local_addr().expect("listener has an address");
    thread::spawn(move || {
        if let Ok((tcp, _)) = listener.accept() {
            thread::sleep(hold_for);
            drop(tcp);
        }
    });
    addr
}

pub fn connect(addr: SocketAddr, config: Config) -> RegisterClient<TcpTransport> {
    let transport = TcpTransport::connect(addr).expect("connect to emulator");
    RegisterClient::with_transport(transport, config)
}
