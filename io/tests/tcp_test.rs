use common::{
    constants::PCMM_CLIENT_TYPE,
    messages::cops::{
        CopsMessage,
        DeleteRequestState,
        Handle,
        KeepAlive,
        Packet,
        Reason,
        ReasonCode,
    },
};
use io::{Connection, FrameReader, Source, TransportError};
use std::{
    collections::VecDeque,
    io::{ErrorKind, Read, Write},
    net::TcpListener,
    time::Duration,
};

/// Hands out pre-arranged reads, one per call.
struct Scripted(VecDeque<std::io::Result<Vec<u8>>>);

impl Read for Scripted {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.0.pop_front() {
            Some(Ok(bytes)) => {
                buf[.. bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(Err(error)) => Err(error),
            None => Ok(0),
        }
    }
}

fn keep_alive_bytes() -> Vec<u8> {
    Packet::new(PCMM_CLIENT_TYPE, KeepAlive::default())
        .to_bytes()
        .unwrap()
}

#[test]
fn test_partial_reads_survive_timeouts() {
    let bytes = keep_alive_bytes();
    let mut script = Scripted(VecDeque::from(vec![
        Ok(bytes[.. 3].to_vec()),
        Err(ErrorKind::WouldBlock.into()),
        Ok(bytes[3 ..].to_vec()),
    ]));

    let mut reader = FrameReader::default();
    assert!(reader.read_frame(&mut script).unwrap().is_none());
    assert_eq!(reader.pending(), 3);
    assert_eq!(reader.read_frame(&mut script).unwrap(), Some(bytes));
    assert_eq!(reader.pending(), 0);
}

#[test]
fn test_two_frames_in_one_read() {
    let mut bytes = keep_alive_bytes();
    bytes.extend(keep_alive_bytes());
    let mut script = Scripted(VecDeque::from(vec![Ok(bytes)]));

    let mut reader = FrameReader::default();
    assert!(reader.read_frame(&mut script).unwrap().is_some());
    assert_eq!(reader.pending(), 8);
    assert!(reader.read_frame(&mut script).unwrap().is_some());
}

#[test]
fn test_interrupted_read_retried() {
    let mut script = Scripted(VecDeque::from(vec![
        Err(ErrorKind::Interrupted.into()),
        Ok(keep_alive_bytes()),
    ]));
    let mut reader = FrameReader::default();
    assert!(reader.read_frame(&mut script).unwrap().is_some());
}

#[test]
fn test_bad_length_is_fatal() {
    let mut script = Scripted(VecDeque::from(vec![Ok(vec![
        0x10, 0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05,
    ])]));
    let mut reader = FrameReader::default();
    match reader.read_frame(&mut script) {
        Err(TransportError::Fatal { source, error }) => {
            assert_eq!(source, Source::ReadCops);
            assert_eq!(error.kind(), ErrorKind::InvalidData);
        }
        result => panic!("expected fatal error, got {:?}", result),
    }
}

#[test]
fn test_end_of_stream_is_closed() {
    let mut script = Scripted(VecDeque::new());
    let mut reader = FrameReader::default();
    assert!(matches!(
        reader.read_frame(&mut script),
        Err(TransportError::Closed(Source::ReadCops))
    ));
}

#[test]
fn test_connection_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut connection =
        Connection::connect(listener.local_addr().unwrap(), Duration::from_millis(50)).unwrap();
    let (mut raw, _) = listener.accept().unwrap();

    // Outgoing messages go through the writer thread
    connection
        .writer()
        .send(&Packet::new(PCMM_CLIENT_TYPE, KeepAlive::default()))
        .unwrap();
    let mut received = [0u8; 8];
    raw.read_exact(&mut received).unwrap();
    assert_eq!(received.to_vec(), keep_alive_bytes());

    // Nothing sent yet: the read times out
    assert!(connection.recv().unwrap().is_none());

    let packet = Packet::new(
        PCMM_CLIENT_TYPE,
        DeleteRequestState {
            handle: Handle::new("h1"),
            reason: Reason::new(ReasonCode::Tear, 0),
            integrity: None,
        },
    );
    let bytes = packet.to_bytes().unwrap();
    raw.write_all(&bytes[.. 10]).unwrap();
    raw.flush().unwrap();
    assert!(connection.recv().unwrap().is_none());
    raw.write_all(&bytes[10 ..]).unwrap();

    let mut decoded = None;
    for _ in 0 .. 20 {
        if let Some(packet) = connection.recv().unwrap() {
            decoded = Some(packet);
            break;
        }
    }
    match decoded.map(|packet| packet.message) {
        Some(CopsMessage::DeleteRequestState(drq)) => {
            assert_eq!(drq.reason.code, ReasonCode::Tear)
        }
        other => panic!("expected delete request state, got {:?}", other),
    }

    drop(raw);
    let mut result = connection.recv();
    for _ in 0 .. 20 {
        if !matches!(result, Ok(None)) {
            break;
        }
        result = connection.recv();
    }
    assert!(matches!(result, Err(TransportError::Closed(Source::ReadCops))));
}

#[test]
fn test_undecodable_message_is_recoverable() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut connection =
        Connection::connect(listener.local_addr().unwrap(), Duration::from_millis(50)).unwrap();
    let (mut raw, _) = listener.accept().unwrap();

    // Well framed, but a Report without any objects
    raw.write_all(&[0x10, 0x03, 0x80, 0x0a, 0x00, 0x00, 0x00, 0x08])
        .unwrap();
    raw.write_all(&keep_alive_bytes()).unwrap();

    let mut results = Vec::new();
    for _ in 0 .. 20 {
        match connection.recv() {
            Ok(None) => continue,
            result => results.push(result),
        }
        if results.len() == 2 {
            break;
        }
    }

    assert!(matches!(
        &results[0],
        Err(TransportError::Recoverable {
            source: Source::ReadCops,
            ..
        })
    ));
    assert!(matches!(
        &results[1],
        Ok(Some(Packet {
            message: CopsMessage::KeepAlive(_),
            ..
        }))
    ));
}
