use crate::{
    debug,
    request_state::{RequestState, RequestStatus},
    InformEvent,
    INTEGRITY_SUBCODE,
};
use common::messages::{
    cops::{
        ClientClose,
        ClientOpen,
        ClientSi,
        Command,
        Context,
        CopsMessage,
        Decision,
        DecisionFlags,
        DecisionMessage,
        DecisionPayload,
        DeleteRequestState,
        ErrorCode,
        ErrorObject,
        Handle,
        Packet,
        PdpAddress,
        PepId,
        Reason,
        ReasonCode,
        Report,
        ReportType,
        Request,
        SyncStateComplete,
        SyncStateRequest,
    },
    pcmm::VersionInfo,
    Data,
    Error,
};
use log::{info, warn};
use std::collections::BTreeMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Opening,
    Open,
    Closed,
}

/// Result of applying one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Applied. The data, if any, is returned to the PDP in the report's ClientSI.
    Success(Option<Data>),
    Failure(Option<Data>),
}

/// Enforces decisions on behalf of a [`PepHandler`].
pub trait DecisionProcessor {
    /// `payload` is the client specific data of the decision set, if it carried any.
    fn install(&mut self, handle: &Handle, payload: Option<&Data>) -> Applied;

    fn remove(&mut self, handle: &Handle, payload: Option<&Data>) -> Applied;

    fn accounting(&mut self, _handle: &Handle) -> Option<Data> {
        None
    }

    /// The request state for `handle` was discarded.
    fn closed(&mut self, _handle: &Handle, _status: RequestStatus) {}
}

pub struct PepHandler<P> {
    state: State,
    client_type: u16,
    pep_id: PepId,
    processor: P,
    requests: BTreeMap<Handle, RequestState>,
    ka_interval: u16,
    acct_interval: u16,
    sync_state: bool,
}

impl<P: DecisionProcessor> PepHandler<P> {
    pub fn new(client_type: u16, pep_id: impl Into<Data>, processor: P) -> Self {
        Self {
            state: State::Idle,
            client_type,
            pep_id: PepId(pep_id.into()),
            processor,
            requests: BTreeMap::new(),
            ka_interval: 0,
            acct_interval: 0,
            sync_state: true,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn client_type(&self) -> u16 {
        self.client_type
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    /// Keep-alive interval granted by the PDP, in seconds. Zero until the connection is open.
    pub fn ka_interval(&self) -> u16 {
        self.ka_interval
    }

    pub fn acct_interval(&self) -> u16 {
        self.acct_interval
    }

    pub fn is_synchronized(&self) -> bool {
        self.sync_state
    }

    pub fn request_state(&self, handle: &Handle) -> Option<&RequestState> {
        self.requests.get(handle)
    }

    pub fn handles(&self) -> impl Iterator<Item = &Handle> {
        self.requests.keys()
    }

    /// Starts the handshake by sending a ClientOpen carrying the PCMM version.
    pub fn open(&mut self, write: &mut Vec<Packet>) -> Result<(), PepError> {
        if self.state != State::Idle {
            return Err(PepError::WrongState("open", self.state));
        }

        let version = VersionInfo::default().to_bytes()?;
        write.push(self.packet(ClientOpen {
            pep_id: self.pep_id.clone(),
            client_si: Some(ClientSi::signaled(version)),
            last_pdp_address: None,
            integrity: None,
        }));
        self.state = State::Opening;
        Ok(())
    }

    /// Asks the PDP for a decision on a new client handle.
    pub fn request(
        &mut self,
        handle: Handle,
        context: Context,
        client_sis: Vec<ClientSi>,
        write: &mut Vec<Packet>,
    ) -> Result<(), PepError> {
        if self.state != State::Open {
            return Err(PepError::WrongState("request", self.state));
        }
        if self.requests.contains_key(&handle) {
            return Err(PepError::DuplicateHandle(debug(&handle)));
        }

        let mut state = RequestState::new(handle.clone(), context, client_sis);
        write.push(self.packet(Self::request_for(&state)));
        state.set_status(RequestStatus::Requested);
        self.requests.insert(handle, state);
        Ok(())
    }

    /// Withdraws a request state and tells the PDP why.
    pub fn delete_request(
        &mut self,
        handle: &Handle,
        reason: Reason,
        write: &mut Vec<Packet>,
    ) -> Result<(), PepError> {
        let mut state = match self.requests.remove(handle) {
            Some(state) => state,
            None => return Err(PepError::UnknownHandle(debug(handle))),
        };

        write.push(self.packet(DeleteRequestState {
            handle: handle.clone(),
            reason,
            integrity: None,
        }));
        state.set_status(RequestStatus::Final);
        self.processor.closed(handle, RequestStatus::Final);
        Ok(())
    }

    /// Sends an accounting report for every request that has been decided on.
    pub fn accounting_reports(&mut self, write: &mut Vec<Packet>) {
        if self.state != State::Open {
            return;
        }

        for (handle, state) in self.requests.iter_mut() {
            if !matches!(
                state.status(),
                RequestStatus::ReportSent
                    | RequestStatus::Accounting
                    | RequestStatus::SyncAll
                    | RequestStatus::New
            ) {
                continue;
            }

            let client_si = self.processor.accounting(handle).map(ClientSi::signaled);
            write.push(Packet::new(self.client_type, Report {
                handle: handle.clone(),
                report_type: ReportType::Accounting,
                client_si,
                integrity: None,
            }));
            state.set_status(RequestStatus::Accounting);
        }
    }

    /// Closes the connection from this side.
    pub fn close(&mut self, error: ErrorObject, write: &mut Vec<Packet>) {
        if matches!(self.state, State::Opening | State::Open) {
            write.push(self.packet(ClientClose {
                error,
                redirect: None,
                integrity: None,
            }));
        }
        self.shut(RequestStatus::ClosedConnection);
    }

    /// The transport is gone. `status` is recorded on every request state before it is dropped.
    pub fn connection_lost(&mut self, status: RequestStatus) {
        self.shut(status);
    }

    /// A message from the PDP could not be decoded. During the handshake this ends the
    /// connection; afterwards the message is dropped.
    pub fn decode_failed(&mut self, error: Error, write: &mut Vec<Packet>) -> Result<(), PepError> {
        match self.state {
            State::Opening => {
                self.close(error.to_error_object(), write);
                Err(match error {
                    Error::MandatoryObjectMissing { object, .. } =>
                        PepError::MandatoryObjectMissing(object),
                    error => PepError::Decode(error),
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
    ) -> Result<(), PepError> {
        match self.state {
            State::Opening => match packet.message {
                CopsMessage::ClientAccept(msg) => {
                    if msg.integrity.is_some() {
                        self.close(
                            ErrorObject::new(ErrorCode::UnknownObject, INTEGRITY_SUBCODE),
                            write,
                        );
                        return Err(PepError::UnsupportedObject("Integrity"));
                    }

                    self.ka_interval = msg.ka_timer.seconds;
                    self.acct_interval = msg.acct_timer.map(|timer| timer.seconds).unwrap_or(0);
                    self.state = State::Open;
                    info!(
                        "connection accepted: keep-alive {}s, accounting {}s",
                        self.ka_interval, self.acct_interval
                    );
                    event.push(InformEvent::PepInform(PepInform::Accepted {
                        ka_interval: self.ka_interval,
                        acct_interval: self.acct_interval,
                    }));
                    Ok(())
                }
                CopsMessage::ClientClose(msg) => {
                    self.closed_by_pdp(msg, event);
                    Ok(())
                }
                message => {
                    self.close(ErrorObject::new(ErrorCode::BadMsgFormat, 0), write);
                    Err(PepError::WrongMessageForState(debug(&message), State::Opening))
                }
            },
            State::Open => match packet.message {
                CopsMessage::Decision(msg) =>
                    self.handle_decision(msg, packet.header.is_solicited(), write, event),
                CopsMessage::SyncStateRequest(msg) => {
                    self.handle_sync(msg, write, event);
                    Ok(())
                }
                CopsMessage::ClientClose(msg) => {
                    self.closed_by_pdp(msg, event);
                    Ok(())
                }
                CopsMessage::KeepAlive(msg) => {
                    if msg.integrity.is_some() {
                        warn!("keep-alive carried an integrity object, ignoring it");
                    }
                    Ok(())
                }
                message => Err(PepError::WrongMessageForState(debug(&message), State::Open)),
            },
            state => Err(PepError::WrongMessageForState(debug(&packet.message), state)),
        }
    }

    fn handle_decision(
        &mut self,
        msg: DecisionMessage,
        solicited: bool,
        write: &mut Vec<Packet>,
        event: &mut Vec<InformEvent>,
    ) -> Result<(), PepError> {
        let handle = msg.handle().clone();
        let state = match self.requests.get_mut(&handle) {
            Some(state) => state,
            None => return Err(PepError::UnknownHandle(debug(&handle))),
        };
        state.set_status(RequestStatus::DecisionsReceived);

        let decisions = match msg.payload() {
            DecisionPayload::Error(error) => {
                warn!(
                    "decision for {:?} carried error {:?}: {}",
                    handle,
                    error.code,
                    error.description()
                );
                state.pending_mut().errors += 1;
                &[][..]
            }
            DecisionPayload::Decisions(decisions) => decisions.as_slice(),
        };

        // The PDP installs or removes the request state itself instead of deciding on it
        for (_, set) in decisions {
            match flags_of(set) {
                Some((Command::Remove, flags)) if flags.contains(DecisionFlags::REQSTATE) => {
                    if let Some(mut state) = self.requests.remove(&handle) {
                        state.set_status(RequestStatus::Deleted);
                    }
                    self.processor.closed(&handle, RequestStatus::Deleted);
                    event.push(InformEvent::PepInform(PepInform::RequestDeleted(handle)));
                    return Ok(());
                }
                Some((Command::Install, flags)) if flags.contains(DecisionFlags::REQSTATE) => {
                    state.set_status(RequestStatus::New);
                    event.push(InformEvent::PepInform(PepInform::RequestInstalled(handle)));
                    return Ok(());
                }
                _ => {}
            }
        }

        for (_, set) in decisions {
            let (command, flags) = match flags_of(set) {
                Some(pair) => pair,
                None => continue,
            };
            let payload = set.iter().find_map(|decision| match decision {
                Decision::ClientSi(data)
                | Decision::Stateless(data)
                | Decision::Replacement(data)
                | Decision::Named(data) => Some(data),
                Decision::Flags { .. } => None,
            });

            let applied = match command {
                // Only an install that asks for error reporting is evaluated by the processor
                Command::Install if flags.contains(DecisionFlags::REQERROR) => {
                    state.pending_mut().installs += 1;
                    self.processor.install(&handle, payload)
                }
                Command::Install => {
                    state.pending_mut().installs += 1;
                    Applied::Success(None)
                }
                Command::Remove => {
                    state.pending_mut().removes += 1;
                    self.processor.remove(&handle, payload)
                }
                Command::Null => continue,
            };

            let pending = state.pending_mut();
            match applied {
                Applied::Success(data) => pending.client_si = data.or(pending.client_si.take()),
                Applied::Failure(data) => {
                    pending.errors += 1;
                    pending.client_si = data.or(pending.client_si.take());
                }
            }
        }

        let pending = state.take_pending();
        let report_type = pending.report_type();
        let mut report = Packet::new(self.client_type, Report {
            handle: handle.clone(),
            report_type,
            client_si: pending.client_si.map(ClientSi::signaled),
            integrity: None,
        });
        if solicited {
            report = report.solicited();
        }
        write.push(report);
        state.set_status(RequestStatus::ReportSent);

        event.push(InformEvent::PepInform(PepInform::DecisionApplied {
            handle,
            report_type,
        }));
        Ok(())
    }

    fn handle_sync(
        &mut self,
        msg: SyncStateRequest,
        write: &mut Vec<Packet>,
        event: &mut Vec<InformEvent>,
    ) {
        let handles: Vec<Handle> = match msg.handle {
            Some(handle) if !self.requests.contains_key(&handle) => {
                warn!("sync requested for unknown handle {:?}", handle);
                write.push(self.packet(DeleteRequestState {
                    handle,
                    reason: Reason::new(ReasonCode::Unspecified, 0),
                    integrity: None,
                }));
                return;
            }
            Some(handle) => vec![handle],
            None => self.requests.keys().cloned().collect(),
        };

        self.sync_state = false;
        for handle in &handles {
            if let Some(state) = self.requests.get_mut(handle) {
                write.push(Packet::new(self.client_type, Self::request_for(state)));
                state.set_status(RequestStatus::Synchronizing);
            }
        }

        write.push(self.packet(SyncStateComplete::default()));
        self.sync_state = true;
        for handle in &handles {
            if let Some(state) = self.requests.get_mut(handle) {
                state.set_status(RequestStatus::SyncAll);
            }
        }
        event.push(InformEvent::PepInform(PepInform::SyncComplete));
    }

    fn closed_by_pdp(&mut self, msg: ClientClose, event: &mut Vec<InformEvent>) {
        info!(
            "PDP closed the connection: {:?} ({})",
            msg.error.code,
            msg.error.description()
        );
        event.push(InformEvent::PepInform(PepInform::Closed(msg.error)));
        if let Some(redirect) = msg.redirect {
            event.push(InformEvent::PepInform(PepInform::Redirected(redirect.0)));
        }
        self.shut(RequestStatus::ClosedConnection);
    }

    fn shut(&mut self, status: RequestStatus) {
        self.state = State::Closed;
        for (handle, mut state) in std::mem::take(&mut self.requests) {
            state.set_status(status);
            self.processor.closed(&handle, status);
        }
    }

    fn request_for(state: &RequestState) -> Request {
        let mut request = Request::new(state.handle().clone(), state.context());
        request.client_sis = state.client_sis().to_vec();
        request
    }

    fn packet(&self, message: impl Into<CopsMessage>) -> Packet {
        Packet::new(self.client_type, message)
    }
}

fn flags_of(set: &[Decision]) -> Option<(Command, DecisionFlags)> {
    set.iter().find_map(|decision| match decision {
        Decision::Flags { command, flags } => Some((*command, *flags)),
        _ => None,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum PepError {
    #[error("invalid message {0} for state {1:?}")]
    WrongMessageForState(String, State),
    #[error("cannot {0} in state {1:?}")]
    WrongState(&'static str, State),
    #[error("mandatory object {0} missing")]
    MandatoryObjectMissing(&'static str),
    #[error("unsupported object {0}")]
    UnsupportedObject(&'static str),
    #[error("unknown client handle {0}")]
    UnknownHandle(String),
    #[error("client handle {0} already in use")]
    DuplicateHandle(String),
    #[error("undecodable message: {0}")]
    Decode(Error),
    #[error("encode error: {0}")]
    Encode(#[from] Error),
}

pub enum PepInform {
    Accepted { ka_interval: u16, acct_interval: u16 },
    Closed(ErrorObject),
    Redirected(PdpAddress),
    DecisionApplied {
        handle: Handle,
        report_type: ReportType,
    },
    RequestInstalled(Handle),
    RequestDeleted(Handle),
    SyncComplete,
}
