use std::{
    io::{Read, Write},
    net::TcpStream,
    sync::Arc,
    thread,
    time::Duration,
};

use regif_client::{
    AsyncRegisterClient, Config, ErrorKind, config::Builder, transport::tcp::TcpTransport,
};
use regif_device::{RegisterFile, server::Server};
use regif_protocol::Command;
use regif_tests::{connect, init_logging, spawn_device, spawn_emulator, spawn_silent_device};

#[test]
fn single_registers_round_trip() {
    init_logging();
    let device = Arc::new(RegisterFile::with_registers([(5, 42)]));
    let (addr, handle) = spawn_device(Arc::clone(&device));
    let client = connect(addr, Config::default());

    assert_eq!(client.read_one::<u32>(5).unwrap(), 42);
    client.write_one(1, 10_u32).unwrap();
    client.write_one(2, -7_i32).unwrap();
    assert_eq!(client.read_one::<u32>(1).unwrap(), 10);
    assert_eq!(client.read_one::<i32>(2).unwrap(), -7);
    assert_eq!(device.get(2), Some(0xFFFF_FFF9));

    client.disconnect().unwrap();
    handle.join().unwrap();
}

#[test]
fn bursts_round_trip() {
    init_logging();
    let device = Arc::new(RegisterFile::new());
    let (addr, handle) = spawn_device(Arc::clone(&device));
    let client = connect(addr, Config::default());

    let words: Vec<u32> = (0..1000).map(|i| i * 7 + 1).collect();
    client.write_burst(0x1_0000, true, &words).unwrap();
    assert_eq!(device.get(0x1_0000 + 999), Some(999 * 7 + 1));

    let read: Vec<u32> = client.read_vec(0x1_0000, true, words.len()).unwrap();
    assert_eq!(read, words);

    let mut partial = [0u32; 3];
    client.read_burst(0x1_0000 + 64, true, &mut partial).unwrap();
    assert_eq!(partial, [64 * 7 + 1, 65 * 7 + 1, 66 * 7 + 1]);

    client.disconnect().unwrap();
    handle.join().unwrap();
}

#[test]
fn fixed_address_transfer() {
    init_logging();
    let device = Arc::new(RegisterFile::new());
    let (addr, handle) = spawn_device(Arc::clone(&device));
    let client = connect(addr, Config::default());

    let words: Vec<u32> = (0..100).collect();
    client.write_burst(0x40, false, &words).unwrap();
    assert_eq!(device.get(0x40), Some(99));
    assert_eq!(device.get(0x41), None);

    let read: Vec<u32> = client.read_vec(0x40, false, 70).unwrap();
    assert!(read.iter().all(|w| *w == 99));

    client.disconnect().unwrap();
    handle.join().unwrap();
}

#[test]
fn silent_device_times_out() {
    init_logging();
    let addr = spawn_silent_device(Duration::from_secs(2));
    let config = Builder::new()
        .single_read_timeout(Duration::from_millis(100))
        .burst_read_timeout(Duration::from_millis(200))
        .build();
    let client = connect(addr, config);

    let err = client.read_one::<u32>(0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    let err = client.read_vec::<u32>(0, true, 10).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[test]
fn concurrent_threads_share_one_connection() {
    init_logging();
    let device = Arc::new(RegisterFile::new());
    let (addr, handle) = spawn_device(Arc::clone(&device));
    let client = Arc::new(connect(addr, Config::default()));

    let workers: Vec<_> = (0..8_u32)
        .map(|id| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                let base = id * 0x1000;
                for round in 0..20 {
                    let words: Vec<u32> = (0..100).map(|i| base + i + round).collect();
                    client.write_burst(base, true, &words).unwrap();
                    let read: Vec<u32> = client.read_vec(base, true, words.len()).unwrap();
                    assert_eq!(read, words);
                    client.write_one(base + 0x800, round).unwrap();
                    assert_eq!(client.read_one::<u32>(base + 0x800).unwrap(), round);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    client.disconnect().unwrap();
    handle.join().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_client_against_device() {
    init_logging();
    let device = Arc::new(RegisterFile::new());
    let (addr, handle) = spawn_device(Arc::clone(&device));
    let transport = TcpTransport::connect(addr).unwrap();
    let client = AsyncRegisterClient::with_transport(transport, Config::default());

    let tasks: Vec<_> = (0..4_u32)
        .map(|id| {
            let client = client.clone();
            tokio::spawn(async move {
                let words: Vec<u32> = (0..130).map(|i| id << 16 | i).collect();
                client.write_burst(id << 16, true, &words).await.unwrap();
                let read: Vec<u32> = client.read_vec(id << 16, true, 130).await.unwrap();
                assert_eq!(read, words);
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(device.get(3 << 16 | 129), Some(3 << 16 | 129));

    client.disconnect().await.unwrap();
    tokio::task::spawn_blocking(move || handle.join().unwrap())
        .await
        .unwrap();
}

#[test]
fn raw_frames_on_the_wire() {
    init_logging();
    let device = Arc::new(RegisterFile::with_registers([(5, 42)]));
    let (addr, handle) = spawn_device(Arc::clone(&device));
    let mut tcp = TcpStream::connect(addr).unwrap();

    tcp.write_all(&[0x80, 0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00])
        .unwrap();
    tcp.write_all(&Command::read(5, false, 1).unwrap().to_bytes())
        .unwrap();
    let mut reply = [0u8; 4];
    tcp.read_exact(&mut reply).unwrap();
    assert_eq!(reply, [0x2A, 0x00, 0x00, 0x00]);

    drop(tcp);
    handle.join().unwrap();
    assert_eq!(device.get(1), Some(10));
}

#[tokio::test]
async fn async_device_serves_blocking_client() {
    init_logging();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let device = Arc::new(RegisterFile::new());
    let server = Server::new(Arc::clone(&device), Default::default());

    let serve = async move {
        let (tcp, _) = listener.accept().await.unwrap();
        server.serve_async(tcp).await
    };
    let host = tokio::task::spawn_blocking(move || {
        let client = connect(addr, Config::default());
        let words: Vec<u32> = (0..70).collect();
        client.write_burst(0, true, &words).unwrap();
        let read: Vec<u32> = client.read_vec(0, true, words.len()).unwrap();
        client.disconnect().unwrap();
        read
    });

    let (served, read) = tokio::join!(serve, host);
    served.unwrap();
    assert_eq!(read.unwrap(), (0..70).collect::<Vec<u32>>());
    assert_eq!(device.get(69), Some(69));
}

#[test]
fn emulator_serves_clients_one_after_another() {
    init_logging();
    let device = Arc::new(RegisterFile::new());
    let addr = spawn_emulator(Arc::clone(&device), Duration::from_secs(5));

    let first = connect(addr, Config::default());
    first.write_burst(0x40, true, &[1_u32, 2, 3]).unwrap();
    first.disconnect().unwrap();

    let second = connect(addr, Config::default());
    assert_eq!(second.read_vec::<u32>(0x40, true, 3).unwrap(), [1, 2, 3]);
    second.disconnect().unwrap();
    assert_eq!(device.get(0x42), Some(3));
}

#[test]
fn idle_session_is_dropped_after_rw_timeout() {
    init_logging();
    let addr = spawn_emulator(RegisterFile::with_registers([(9, 99)]), Duration::from_millis(100));

    // Holds the only session without sending anything.
    let idle = TcpStream::connect(addr).unwrap();
    let client = connect(addr, Config::default());
    assert_eq!(client.read_one::<u32>(9).unwrap(), 99);
    drop(idle);
}
