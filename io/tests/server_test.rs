use io::{CopsServer, WorkerPool};
use std::{
    io::{Read, Write},
    net::TcpStream,
    thread,
    time::Duration,
};

#[test]
fn test_accepts_and_runs_handler() {
    let pool = WorkerPool::new(2).unwrap();
    let server = CopsServer::bind("127.0.0.1:0", pool, |mut stream, _shutdown| {
        stream.write_all(b"ok").unwrap();
    })
    .unwrap();

    let mut client = TcpStream::connect(server.local_addr()).unwrap();
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let mut reply = [0u8; 2];
    client.read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b"ok");
}

#[test]
fn test_stop_signals_sessions() {
    let pool = WorkerPool::new(1).unwrap();
    let mut server = CopsServer::bind("127.0.0.1:0", pool, |_stream, shutdown| {
        while !shutdown.is_triggered() {
            thread::sleep(Duration::from_millis(10));
        }
    })
    .unwrap();

    let _client = TcpStream::connect(server.local_addr()).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(server.is_running());

    server.stop();
    assert!(server.shutdown_signal().is_triggered());
    assert!(!server.is_running());
}
