use common::{
    constants::PCMM_CLIENT_TYPE,
    messages::{
        cops::{ClientAccept, Context, CopsMessage, Handle, KaTimer, Packet, RType},
        Data,
    },
};
use peer::{
    pep_handler::{Applied, DecisionProcessor, PepHandler, State},
    request_state::RequestStatus,
};
use std::collections::VecDeque;

/// Records what it is asked to do and answers with scripted outcomes, `Success(None)` once
/// the script runs out.
#[derive(Default)]
pub struct Recorder {
    pub outcomes: VecDeque<Applied>,
    pub installs: Vec<(Handle, Option<Data>)>,
    pub removes: Vec<(Handle, Option<Data>)>,
    pub closed: Vec<(Handle, RequestStatus)>,
}

impl Recorder {
    pub fn with_outcomes(outcomes: Vec<Applied>) -> Self {
        Self {
            outcomes: outcomes.into(),
            ..Self::default()
        }
    }

    fn next(&mut self) -> Applied {
        self.outcomes.pop_front().unwrap_or(Applied::Success(None))
    }
}

impl DecisionProcessor for Recorder {
    fn install(&mut self, handle: &Handle, payload: Option<&Data>) -> Applied {
        self.installs.push((handle.clone(), payload.cloned()));
        self.next()
    }

    fn remove(&mut self, handle: &Handle, payload: Option<&Data>) -> Applied {
        self.removes.push((handle.clone(), payload.cloned()));
        self.next()
    }

    fn accounting(&mut self, _handle: &Handle) -> Option<Data> {
        Some(Data::from("usage"))
    }

    fn closed(&mut self, handle: &Handle, status: RequestStatus) {
        self.closed.push((handle.clone(), status));
    }
}

pub fn packet(message: impl Into<CopsMessage>) -> Packet {
    Packet::new(PCMM_CLIENT_TYPE, message)
}

pub fn context() -> Context {
    Context::new(RType::Configuration, 0)
}

/// A handler that has finished the handshake with a 5 second keep-alive and sent one request
/// for handle "h1".
pub fn open_handler(processor: Recorder) -> PepHandler<Recorder> {
    let mut handler = PepHandler::new(PCMM_CLIENT_TYPE, "CMTS", processor);
    let mut write = Vec::new();
    let mut events = Vec::new();

    handler.open(&mut write).unwrap();
    handler
        .handle(
            packet(ClientAccept {
                ka_timer: KaTimer::new(5),
                acct_timer: None,
                integrity: None,
            }),
            &mut write,
            &mut events,
        )
        .unwrap();
    assert_eq!(handler.state(), State::Open);

    handler
        .request(Handle::new("h1"), context(), Vec::new(), &mut write)
        .unwrap();
    handler
}
