use crate::{ScheduleError, WorkerPool};
use common::sync::JoinOnDrop;
use log::{debug, error, info, warn};
use std::{
    io::{self, ErrorKind},
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

/// Cooperative stop flag shared between a server and the sessions it runs.
#[derive(Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Accepts connections on a dedicated thread and runs each one on the worker pool.
///
/// The listener is polled without blocking, so stopping only needs the flag to be set.
pub struct CopsServer {
    local_addr: SocketAddr,
    shutdown: ShutdownSignal,
    handle: Option<JoinOnDrop<()>>,
}

impl CopsServer {
    pub fn bind<A, H>(addr: A, pool: WorkerPool, handler: H) -> io::Result<Self>
    where
        A: ToSocketAddrs,
        H: Fn(TcpStream, ShutdownSignal) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let shutdown = ShutdownSignal::new();
        let handle = thread::Builder::new().name("cops-accept".into()).spawn({
            let shutdown = shutdown.clone();
            move || listen(listener, pool, Arc::new(handler), shutdown)
        })?;

        info!("listening on {}", local_addr);
        Ok(Self {
            local_addr,
            shutdown,
            handle: Some(JoinOnDrop::new(handle)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stops accepting, tells running sessions to stop and waits for them.
    pub fn stop(&mut self) {
        self.shutdown.trigger();
        self.handle = None;
    }
}

impl Drop for CopsServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn listen<H>(listener: TcpListener, mut pool: WorkerPool, handler: Arc<H>, shutdown: ShutdownSignal)
where
    H: Fn(TcpStream, ShutdownSignal) + Send + Sync + 'static,
{
    for stream in listener.incoming() {
        if shutdown.is_triggered() {
            break;
        }

        let stream = match stream {
            Ok(stream) => stream,
            Err(error) if error.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(error) => {
                warn!("accept failed: {}", error);
                continue;
            }
        };

        // Accepted sockets inherit the listener's nonblocking mode on some platforms
        if let Err(error) = stream.set_nonblocking(false) {
            warn!("dropping connection: {}", error);
            continue;
        }

        let peer = stream.peer_addr().ok();
        debug!("accepted connection from {:?}", peer);
        let result = pool.schedule({
            let handler = Arc::clone(&handler);
            let shutdown = shutdown.clone();
            move || handler(stream, shutdown)
        });

        // The job, and with it the socket, is dropped when it cannot be scheduled
        match result {
            Ok(()) => {}
            Err(ScheduleError::Exhausted) =>
                warn!("no worker available, closing connection from {:?}", peer),
            Err(ScheduleError::ShutDown) => {
                error!("worker pool shut down, closing connection from {:?}", peer);
                break;
            }
        }
    }

    pool.shutdown();
    info!("listener stopped");
}
