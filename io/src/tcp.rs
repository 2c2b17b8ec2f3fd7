use crate::{SendError, Source, TransportError};
use common::{
    constants::COMMON_HEADER_LEN,
    messages::cops::{check_total_len, Packet},
};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error};
use std::{
    io::{self, ErrorKind, Read, Write},
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    sync::Arc,
    thread,
    time::Duration,
};

const READ_CHUNK: usize = 4096;
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

enum Outgoing {
    Message(Vec<u8>),
    /// Answered once everything queued before it is written.
    Flush(Sender<()>),
}

/// One COPS connection. Reads happen on the owning thread and time out after `read_timeout`;
/// writes are queued to a dedicated writer thread so other threads can send through a
/// [`CopsWriter`].
pub struct Connection {
    stream: Arc<TcpStream>,
    reader: FrameReader,
    writer: CopsWriter,
    peer_addr: SocketAddr,
}

impl Connection {
    pub fn new(stream: TcpStream, read_timeout: Duration) -> io::Result<Self> {
        stream.set_read_timeout(Some(read_timeout))?;
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?;

        let stream = Arc::new(stream);
        let (write_tx, write_rx) = unbounded();
        thread::Builder::new()
            .name(format!("cops-write-{}", peer_addr))
            .spawn({
                let stream = Arc::clone(&stream);
                move || write_cops(stream, write_rx)
            })?;

        Ok(Self {
            stream,
            reader: FrameReader::default(),
            writer: CopsWriter(write_tx),
            peer_addr,
        })
    }

    pub fn connect<A: ToSocketAddrs>(addr: A, read_timeout: Duration) -> io::Result<Self> {
        Self::new(TcpStream::connect(addr)?, read_timeout)
    }

    /// Waits up to the read timeout for the next message. `Ok(None)` means the timeout elapsed
    /// before a whole message arrived; partial data is kept for the next call.
    pub fn recv(&mut self) -> Result<Option<Packet>, TransportError> {
        match self.reader.read_frame(&*self.stream)? {
            Some(frame) => Packet::read(&frame)
                .map(Some)
                .map_err(|error| TransportError::Recoverable {
                    source: Source::ReadCops,
                    error,
                }),
            None => Ok(None),
        }
    }

    pub fn send(&self, packet: &Packet) -> Result<(), TransportError> {
        self.writer.send(packet)
    }

    pub fn writer(&self) -> CopsWriter {
        self.writer.clone()
    }

    pub fn closer(&self) -> Closer {
        Closer(Arc::clone(&self.stream))
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Writes out whatever is still queued, then shuts the stream down.
    pub fn close(&self) {
        let (ack_tx, ack_rx) = bounded(1);
        if self.writer.0.send(Outgoing::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv_timeout(FLUSH_TIMEOUT);
        }
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Queues encoded messages for the writer thread of a [`Connection`].
#[derive(Clone)]
pub struct CopsWriter(Sender<Outgoing>);

impl CopsWriter {
    pub fn send(&self, packet: &Packet) -> Result<(), TransportError> {
        let bytes = packet
            .to_bytes()
            .map_err(|error| TransportError::Recoverable {
                source: Source::WriteCops,
                error,
            })?;
        self.0
            .send(Outgoing::Message(bytes))
            .map_err(|_| SendError(Source::WriteCops).into())
    }
}

/// Shuts a connection down from another thread, unblocking its reader.
#[derive(Clone)]
pub struct Closer(Arc<TcpStream>);

impl Closer {
    pub fn close(&self) {
        let _ = self.0.shutdown(Shutdown::Both);
    }
}

/// Cuts COPS messages out of a byte stream using the length in the common header.
#[derive(Default)]
pub struct FrameReader {
    buffer: Vec<u8>,
}

impl FrameReader {
    pub fn read_frame<R>(&mut self, mut stream: R) -> Result<Option<Vec<u8>>, TransportError>
    where
        R: Read,
    {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(Some(frame));
            }

            match stream.read(&mut chunk) {
                // The syscall exited successfully, but no data remained, meaning the stream closed
                Ok(0) => return Err(TransportError::Closed(Source::ReadCops)),
                Ok(read) => self.buffer.extend_from_slice(&chunk[.. read]),
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error)
                    if matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                    return Ok(None),
                Err(error) =>
                    return Err(TransportError::Fatal {
                        source: Source::ReadCops,
                        error,
                    }),
            }
        }
    }

    /// Number of buffered bytes not yet returned as a frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn take_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.buffer.len() < COMMON_HEADER_LEN {
            return Ok(None);
        }

        let total_len = u32::from_be_bytes([
            self.buffer[4],
            self.buffer[5],
            self.buffer[6],
            self.buffer[7],
        ]);
        // A bad length means the stream can no longer be framed
        if let Err(error) = check_total_len(total_len) {
            return Err(TransportError::Fatal {
                source: Source::ReadCops,
                error: io::Error::new(ErrorKind::InvalidData, error),
            });
        }

        let total_len = total_len as usize;
        if self.buffer.len() < total_len {
            return Ok(None);
        }
        Ok(Some(self.buffer.drain(.. total_len).collect()))
    }
}

fn write_cops(stream: Arc<TcpStream>, receiver: Receiver<Outgoing>) {
    while let Ok(outgoing) = receiver.recv() {
        let msg = match outgoing {
            Outgoing::Message(msg) => msg,
            Outgoing::Flush(ack) => {
                let _ = ack.send(());
                continue;
            }
        };
        if let Err(error) = (&*stream).write_all(&msg) {
            error!("fatal error in {:?}: {}", Source::WriteCops, error);
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }
    }

    debug!("writer finished");
}
