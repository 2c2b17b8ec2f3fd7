//! Drives a handler over one [`Connection`] until it closes. Each session is run by a single
//! thread, which owns the handler and every request state in it.

use crate::{
    helpers::random::random_fraction,
    keep_alive::{KeepAliveTimer, Liveness, TimerEvent},
    pdp_handler::{self, PdpError, PdpHandler, PdpInform},
    pep_handler::{self, DecisionProcessor, PepHandler, PepInform},
    request_state::RequestStatus,
    InformEvent,
};
use common::messages::cops::{Context, ErrorCode, ErrorObject, Handle, Packet, RType};
use io::{Connection, ShutdownSignal, TransportError};
use log::{debug, error, info, warn};
use std::time::Instant;

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    ClosedByPeer,
    ClosedLocally,
    KeepAliveExpired,
    ConnectionLost,
    /// The shutdown signal was triggered.
    Stopped,
    ProtocolError,
}

/// The PEP side: opens the connection, asks for decisions on one client handle and applies them.
pub struct PepSession<P> {
    connection: Connection,
    handler: PepHandler<P>,
    shutdown: ShutdownSignal,
    handle: Handle,
    timer: Option<KeepAliveTimer>,
}

impl<P: DecisionProcessor> PepSession<P> {
    pub fn new(
        connection: Connection,
        handler: PepHandler<P>,
        shutdown: ShutdownSignal,
        handle: Handle,
    ) -> Self {
        Self {
            connection,
            handler,
            shutdown,
            handle,
            timer: None,
        }
    }

    pub fn handler(&self) -> &PepHandler<P> {
        &self.handler
    }

    pub fn run(mut self) -> SessionEnd {
        let end = self.run_inner();
        info!("session with {} ended: {:?}", self.connection.peer_addr(), end);
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
        self.connection.close();
        end
    }

    fn run_inner(&mut self) -> SessionEnd {
        let mut write = Vec::new();
        let mut events = Vec::new();

        if let Err(e) = self.handler.open(&mut write) {
            error!("could not open: {}", e);
            return SessionEnd::ProtocolError;
        }
        if self.flush(&mut write).is_err() {
            return SessionEnd::ConnectionLost;
        }

        loop {
            if self.shutdown.is_triggered() {
                self.handler
                    .close(ErrorObject::new(ErrorCode::ShuttingDown, 0), &mut write);
                let _ = self.flush(&mut write);
                return SessionEnd::Stopped;
            }

            if let Some(end) = self.poll_timer(&mut write) {
                return end;
            }
            if self.flush(&mut write).is_err() {
                return self.lost();
            }

            let packet = match self.connection.recv() {
                Ok(Some(packet)) => packet,
                Ok(None) => continue,
                Err(TransportError::Recoverable { error, .. }) => {
                    self.received();
                    let result = self.handler.decode_failed(error, &mut write);
                    let _ = self.flush(&mut write);
                    match result {
                        Ok(()) => continue,
                        Err(e) => {
                            error!("handshake failed: {}", e);
                            return SessionEnd::ProtocolError;
                        }
                    }
                }
                Err(e) => {
                    debug!("transport: {}", e);
                    return self.lost();
                }
            };

            self.received();
            let result = self.handler.handle(packet, &mut write, &mut events);
            if let Err(e) = result {
                warn!("{}", e);
            }

            let mut closed_by_peer = false;
            for event in events.drain(..) {
                match event {
                    InformEvent::PepInform(PepInform::Accepted {
                        ka_interval,
                        acct_interval,
                    }) => {
                        self.start_timer(ka_interval, acct_interval);
                        let request = self.handler.request(
                            self.handle.clone(),
                            Context::new(RType::Configuration, 0),
                            Vec::new(),
                            &mut write,
                        );
                        if let Err(e) = request {
                            error!("could not send request: {}", e);
                        }
                    }
                    InformEvent::PepInform(PepInform::Closed(_)) => closed_by_peer = true,
                    InformEvent::PepInform(PepInform::Redirected(address)) =>
                        info!("redirected to {}:{}", address.address, address.port),
                    InformEvent::PepInform(PepInform::DecisionApplied {
                        handle,
                        report_type,
                    }) => info!("reported {:?} for {:?}", report_type, handle),
                    _ => {}
                }
            }

            if self.flush(&mut write).is_err() {
                return self.lost();
            }
            if closed_by_peer {
                return SessionEnd::ClosedByPeer;
            }
            if self.handler.state() == pep_handler::State::Closed {
                return SessionEnd::ProtocolError;
            }
        }
    }

    fn start_timer(&mut self, ka_interval: u16, acct_interval: u16) {
        let liveness = Liveness::pep(
            ka_interval,
            acct_interval,
            Instant::now(),
            random_fraction().unwrap_or(0.5),
        );
        if !liveness.is_enabled() {
            return;
        }

        match KeepAliveTimer::start(
            liveness,
            self.handler.client_type(),
            self.connection.writer(),
            self.connection.closer(),
        ) {
            Ok(timer) => self.timer = Some(timer),
            Err(e) => error!("could not start keep-alive timer: {}", e),
        }
    }

    fn poll_timer(&mut self, write: &mut Vec<Packet>) -> Option<SessionEnd> {
        let timer = self.timer.as_ref()?;
        while let Some(event) = timer.try_event() {
            match event {
                TimerEvent::Accounting => self.handler.accounting_reports(write),
                TimerEvent::Dead => {
                    self.handler.connection_lost(RequestStatus::NoKeepAlive);
                    return Some(SessionEnd::KeepAliveExpired);
                }
            }
        }
        None
    }

    fn lost(&mut self) -> SessionEnd {
        // The timer shuts the socket down when the peer goes quiet
        let mut write = Vec::new();
        if let Some(end) = self.poll_timer(&mut write) {
            return end;
        }
        self.handler.connection_lost(RequestStatus::ClosedConnection);
        SessionEnd::ConnectionLost
    }

    fn received(&self) {
        if let Some(timer) = &self.timer {
            timer.received();
        }
    }

    fn flush(&self, write: &mut Vec<Packet>) -> Result<(), TransportError> {
        flush(&self.connection, self.timer.as_ref(), write)
    }
}

/// Whether a PDP session keeps going after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Close,
}

/// Makes the decisions of a PDP session.
pub trait PolicyDecider {
    /// Called for every event the handler raises. Decisions are sent through `handler`.
    fn inform(
        &mut self,
        inform: &PdpInform,
        handler: &mut PdpHandler,
        write: &mut Vec<Packet>,
    ) -> Result<Control, PdpError>;
}

/// The PDP side: accepts the PEP's ClientOpen and answers its requests through a
/// [`PolicyDecider`].
pub struct PdpSession<D> {
    connection: Connection,
    handler: PdpHandler,
    decider: D,
    shutdown: ShutdownSignal,
    timer: Option<KeepAliveTimer>,
}

impl<D: PolicyDecider> PdpSession<D> {
    pub fn new(
        connection: Connection,
        handler: PdpHandler,
        decider: D,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            connection,
            handler,
            decider,
            shutdown,
            timer: None,
        }
    }

    pub fn decider(&self) -> &D {
        &self.decider
    }

    pub fn run(mut self) -> (SessionEnd, D) {
        let end = self.run_inner();
        info!("session with {} ended: {:?}", self.connection.peer_addr(), end);
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
        self.connection.close();
        (end, self.decider)
    }

    fn run_inner(&mut self) -> SessionEnd {
        let mut write = Vec::new();
        let mut events = Vec::new();

        loop {
            if self.shutdown.is_triggered() {
                self.handler
                    .close(ErrorObject::new(ErrorCode::ShuttingDown, 0), &mut write);
                let _ = self.flush(&mut write);
                return SessionEnd::Stopped;
            }

            if self.timer_expired() {
                self.handler.connection_lost();
                return SessionEnd::KeepAliveExpired;
            }

            let packet = match self.connection.recv() {
                Ok(Some(packet)) => packet,
                Ok(None) => continue,
                Err(TransportError::Recoverable { error, .. }) => {
                    self.received();
                    let result = self.handler.decode_failed(error, &mut write);
                    let _ = self.flush(&mut write);
                    match result {
                        Ok(()) => continue,
                        Err(e) => {
                            error!("handshake failed: {}", e);
                            return SessionEnd::ProtocolError;
                        }
                    }
                }
                Err(e) => {
                    debug!("transport: {}", e);
                    if self.timer_expired() {
                        self.handler.connection_lost();
                        return SessionEnd::KeepAliveExpired;
                    }
                    self.handler.connection_lost();
                    return SessionEnd::ConnectionLost;
                }
            };

            self.received();
            if let Err(e) = self.handler.handle(packet, &mut write, &mut events) {
                warn!("{}", e);
            }

            let mut end = None;
            for event in events.drain(..) {
                let inform = match event {
                    InformEvent::PdpInform(inform) => inform,
                    InformEvent::PepInform(_) => continue,
                };

                match &inform {
                    PdpInform::Opened { .. } => self.start_timer(),
                    PdpInform::Closed(_) => end = Some(SessionEnd::ClosedByPeer),
                    _ => {}
                }

                match self.decider.inform(&inform, &mut self.handler, &mut write) {
                    Ok(Control::Continue) => {}
                    Ok(Control::Close) => {
                        self.handler
                            .close(ErrorObject::new(ErrorCode::Unknown, 0), &mut write);
                        end = end.or(Some(SessionEnd::ClosedLocally));
                    }
                    Err(e) => warn!("decider failed: {}", e),
                }
            }

            if self.flush(&mut write).is_err() {
                self.handler.connection_lost();
                return SessionEnd::ConnectionLost;
            }
            if let Some(end) = end {
                return end;
            }
            if self.handler.state() == pdp_handler::State::Closed {
                return SessionEnd::ProtocolError;
            }
        }
    }

    fn start_timer(&mut self) {
        let liveness = Liveness::pdp(self.handler.ka_interval(), Instant::now());
        if !liveness.is_enabled() {
            return;
        }

        match KeepAliveTimer::start(
            liveness,
            self.handler.client_type(),
            self.connection.writer(),
            self.connection.closer(),
        ) {
            Ok(timer) => self.timer = Some(timer),
            Err(e) => error!("could not start keep-alive timer: {}", e),
        }
    }

    fn timer_expired(&self) -> bool {
        match &self.timer {
            Some(timer) => std::iter::from_fn(|| timer.try_event()).any(|e| e == TimerEvent::Dead),
            None => false,
        }
    }

    fn received(&self) {
        if let Some(timer) = &self.timer {
            timer.received();
        }
    }

    fn flush(&self, write: &mut Vec<Packet>) -> Result<(), TransportError> {
        flush(&self.connection, self.timer.as_ref(), write)
    }
}

fn flush(
    connection: &Connection,
    timer: Option<&KeepAliveTimer>,
    write: &mut Vec<Packet>,
) -> Result<(), TransportError> {
    for packet in write.drain(..) {
        debug!("sending {}", packet.message.op_code().name());
        connection.send(&packet)?;
        if let Some(timer) = timer {
            timer.sent();
        }
    }
    Ok(())
}
