use crate::{debug, InformEvent, INTEGRITY_SUBCODE};
use common::messages::{
    cops::{
        AcctTimer,
        ClientAccept,
        ClientClose,
        ClientSi,
        Command,
        Context,
        CopsMessage,
        Decision,
        DecisionFlags,
        DecisionMessage,
        ErrorCode,
        ErrorObject,
        Handle,
        KaTimer,
        KeepAlive,
        Packet,
        Reason,
        ReportType,
        SyncStateRequest,
    },
    Data,
    Error,
};
use log::{info, warn};
use std::collections::BTreeMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    AwaitingOpen,
    Open,
    Closed,
}

/// What the PDP knows about one of the PEP's client handles.
#[derive(Debug, Clone)]
pub struct PdpRequest {
    pub context: Context,
    pub client_sis: Vec<ClientSi>,
    pub last_report: Option<ReportType>,
    /// A Request arrived and has not been answered yet. The next decision is solicited.
    awaiting_decision: bool,
}

pub struct PdpHandler {
    state: State,
    client_type: u16,
    ka_interval: u16,
    acct_interval: u16,
    pep_id: Option<Data>,
    requests: BTreeMap<Handle, PdpRequest>,
    awaiting_sync: bool,
}

impl PdpHandler {
    /// `ka_interval` and `acct_interval` are offered in the ClientAccept. An accounting interval
    /// of zero is left out.
    pub fn new(client_type: u16, ka_interval: u16, acct_interval: u16) -> Self {
        Self {
            state: State::AwaitingOpen,
            client_type,
            ka_interval,
            acct_interval,
            pep_id: None,
            requests: BTreeMap::new(),
            awaiting_sync: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn client_type(&self) -> u16 {
        self.client_type
    }

    pub fn ka_interval(&self) -> u16 {
        self.ka_interval
    }

    pub fn pep_id(&self) -> Option<&Data> {
        self.pep_id.as_ref()
    }

    pub fn request(&self, handle: &Handle) -> Option<&PdpRequest> {
        self.requests.get(handle)
    }

    pub fn handles(&self) -> impl Iterator<Item = &Handle> {
        self.requests.keys()
    }

    pub fn is_synchronizing(&self) -> bool {
        self.awaiting_sync
    }

    /// Sends one decision set for `handle`: the flags decision, then `data` if given.
    pub fn decision(
        &mut self,
        handle: &Handle,
        command: Command,
        flags: DecisionFlags,
        data: Option<Decision>,
        write: &mut Vec<Packet>,
    ) -> Result<(), PdpError> {
        if self.state != State::Open {
            return Err(PdpError::WrongState("decide", self.state));
        }
        let request = match self.requests.get_mut(handle) {
            Some(request) => request,
            None => return Err(PdpError::UnknownHandle(debug(handle))),
        };

        let msg = DecisionMessage::single(handle.clone(), request.context, command, flags, data)?;
        let mut packet = Packet::new(self.client_type, msg);
        if request.awaiting_decision {
            packet = packet.solicited();
            request.awaiting_decision = false;
        }
        write.push(packet);
        Ok(())
    }

    /// Asks the PEP to install a PCMM gate carried in `gate`.
    pub fn install(
        &mut self,
        handle: &Handle,
        gate: impl Into<Data>,
        write: &mut Vec<Packet>,
    ) -> Result<(), PdpError> {
        self.decision(
            handle,
            Command::Install,
            DecisionFlags::REQERROR,
            Some(Decision::ClientSi(gate.into())),
            write,
        )
    }

    /// Answers `handle` with an error instead of decisions.
    pub fn reject(
        &mut self,
        handle: &Handle,
        error: ErrorObject,
        write: &mut Vec<Packet>,
    ) -> Result<(), PdpError> {
        if self.state != State::Open {
            return Err(PdpError::WrongState("reject", self.state));
        }
        let request = match self.requests.get_mut(handle) {
            Some(request) => request,
            None => return Err(PdpError::UnknownHandle(debug(handle))),
        };

        let mut packet = Packet::new(self.client_type, DecisionMessage::error(handle.clone(), error));
        if request.awaiting_decision {
            packet = packet.solicited();
            request.awaiting_decision = false;
        }
        write.push(packet);
        Ok(())
    }

    /// Tells the PEP to drop the request state for `handle`.
    pub fn remove_request_state(
        &mut self,
        handle: &Handle,
        write: &mut Vec<Packet>,
    ) -> Result<(), PdpError> {
        self.decision(handle, Command::Remove, DecisionFlags::REQSTATE, None, write)?;
        self.requests.remove(handle);
        Ok(())
    }

    /// Asks the PEP to resend its requests, for one handle or all of them.
    pub fn sync_request(
        &mut self,
        handle: Option<Handle>,
        write: &mut Vec<Packet>,
    ) -> Result<(), PdpError> {
        if self.state != State::Open {
            return Err(PdpError::WrongState("synchronize", self.state));
        }

        write.push(Packet::new(self.client_type, SyncStateRequest {
            handle,
            integrity: None,
        }));
        self.awaiting_sync = true;
        Ok(())
    }

    pub fn close(&mut self, error: ErrorObject, write: &mut Vec<Packet>) {
        if matches!(self.state, State::AwaitingOpen | State::Open) {
            write.push(Packet::new(self.client_type, ClientClose {
                error,
                redirect: None,
                integrity: None,
            }));
        }
        self.shut();
    }

    pub fn connection_lost(&mut self) {
        self.shut();
    }

    /// Same policy as the PEP: fatal before the connection is open, dropped afterwards.
    pub fn decode_failed(&mut self, error: Error, write: &mut Vec<Packet>) -> Result<(), PdpError> {
        match self.state {
            State::AwaitingOpen => {
                self.close(error.to_error_object(), write);
                Err(match error {
                    Error::MandatoryObjectMissing { object, .. } =>
                        PdpError::MandatoryObjectMissing(object),
                    error => PdpError::Decode(error),
                })
            }
            _ => {
                warn!("dropping undecodable message: {}", error);
                Ok(())
            }
        }
    }

    pub fn handle(
        &mut self,
        packet: Packet,
        write: &mut Vec<Packet>,
        event: &mut Vec<InformEvent>,
    ) -> Result<(), PdpError> {
        match self.state {
            State::AwaitingOpen => match packet.message {
                CopsMessage::ClientOpen(msg) => {
                    if packet.header.client_type != self.client_type {
                        self.close(ErrorObject::new(ErrorCode::UnsupportedClientType, 0), write);
                        return Err(PdpError::UnsupportedClientType(packet.header.client_type));
                    }
                    if msg.integrity.is_some() {
                        self.close(
                            ErrorObject::new(ErrorCode::UnknownObject, INTEGRITY_SUBCODE),
                            write,
                        );
                        return Err(PdpError::UnsupportedObject("Integrity"));
                    }

                    write.push(Packet::new(self.client_type, ClientAccept {
                        ka_timer: KaTimer::new(self.ka_interval),
                        acct_timer: (self.acct_interval > 0)
                            .then(|| AcctTimer::new(self.acct_interval)),
                        integrity: None,
                    }));
                    self.state = State::Open;
                    info!("accepted PEP {:?}", msg.pep_id.0);

                    self.pep_id = Some(msg.pep_id.0.clone());
                    event.push(InformEvent::PdpInform(PdpInform::Opened {
                        pep_id: msg.pep_id.0,
                        client_si: msg.client_si.map(|si| si.data),
                    }));
                    Ok(())
                }
                message => {
                    self.close(ErrorObject::new(ErrorCode::BadMsgFormat, 0), write);
                    Err(PdpError::WrongMessageForState(debug(&message), State::AwaitingOpen))
                }
            },
            State::Open => match packet.message {
                CopsMessage::Request(msg) => {
                    let request = PdpRequest {
                        context: msg.context,
                        client_sis: msg.client_sis.clone(),
                        last_report: None,
                        awaiting_decision: true,
                    };
                    self.requests.insert(msg.handle.clone(), request);
                    event.push(InformEvent::PdpInform(PdpInform::Request {
                        handle: msg.handle,
                        context: msg.context,
                        client_sis: msg.client_sis,
                    }));
                    Ok(())
                }
                CopsMessage::Report(msg) => {
                    let request = match self.requests.get_mut(&msg.handle) {
                        Some(request) => request,
                        None => return Err(PdpError::UnknownHandle(debug(&msg.handle))),
                    };
                    request.last_report = Some(msg.report_type);
                    event.push(InformEvent::PdpInform(PdpInform::Report {
                        handle: msg.handle,
                        report_type: msg.report_type,
                        client_si: msg.client_si.map(|si| si.data),
                    }));
                    Ok(())
                }
                CopsMessage::DeleteRequestState(msg) => {
                    if self.requests.remove(&msg.handle).is_none() {
                        warn!("PEP deleted unknown handle {:?}", msg.handle);
                    }
                    event.push(InformEvent::PdpInform(PdpInform::Deleted {
                        handle: msg.handle,
                        reason: msg.reason,
                    }));
                    Ok(())
                }
                CopsMessage::SyncStateComplete(_) => {
                    self.awaiting_sync = false;
                    event.push(InformEvent::PdpInform(PdpInform::SyncComplete));
                    Ok(())
                }
                CopsMessage::KeepAlive(_) => {
                    write.push(Packet::new(self.client_type, KeepAlive::default()));
                    Ok(())
                }
                CopsMessage::ClientClose(msg) => {
                    info!(
                        "PEP closed the connection: {:?} ({})",
                        msg.error.code,
                        msg.error.description()
                    );
                    event.push(InformEvent::PdpInform(PdpInform::Closed(msg.error)));
                    self.shut();
                    Ok(())
                }
                message => Err(PdpError::WrongMessageForState(debug(&message), State::Open)),
            },
            State::Closed => Err(PdpError::WrongMessageForState(
                debug(&packet.message),
                State::Closed,
            )),
        }
    }

    fn shut(&mut self) {
        self.state = State::Closed;
        self.requests.clear();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdpError {
    #[error("invalid message {0} for state {1:?}")]
    WrongMessageForState(String, State),
    #[error("cannot {0} in state {1:?}")]
    WrongState(&'static str, State),
    #[error("unsupported client type {0:#06x}")]
    UnsupportedClientType(u16),
    #[error("mandatory object {0} missing")]
    MandatoryObjectMissing(&'static str),
    #[error("unsupported object {0}")]
    UnsupportedObject(&'static str),
    #[error("unknown client handle {0}")]
    UnknownHandle(String),
    #[error("undecodable message: {0}")]
    Decode(Error),
    #[error("invalid decision: {0}")]
    InvalidDecision(#[from] Error),
}

pub enum PdpInform {
    Opened {
        pep_id: Data,
        client_si: Option<Data>,
    },
    Request {
        handle: Handle,
        context: Context,
        client_sis: Vec<ClientSi>,
    },
    Report {
        handle: Handle,
        report_type: ReportType,
        client_si: Option<Data>,
    },
    Deleted {
        handle: Handle,
        reason: Reason,
    },
    SyncComplete,
    Closed(ErrorObject),
}
