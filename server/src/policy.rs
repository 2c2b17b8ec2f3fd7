//! What the policy server emulator does with a CMTS: commit one gate, ask about it, delete it.

use common::messages::{
    cops::{Handle, Packet},
    pcmm::{
        Amid,
        Classifier,
        Direction,
        GateCommand,
        GateId,
        GateRequest,
        GateSpec,
        SubscriberId,
        TrafficProfile,
        TransactionId,
    },
    Data,
    Error,
};
use log::{info, warn};
use peer::{
    pdp_handler::{PdpError, PdpHandler, PdpInform},
    session::{Control, PolicyDecider},
};
use std::net::IpAddr;

const APP_TYPE: u16 = 1;
const APP_MGR_TAG: u16 = 0x5043;
/// Best effort envelope: authorized, reserved and committed.
const ENVELOPE: u8 = 7;
const LEGACY_CLASSIFIER: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AwaitingRequest,
    Set,
    Info,
    Delete,
    Done,
}

pub struct GateScript {
    template: GateRequest,
    trans_id: u16,
    step: Step,
    handle: Option<Handle>,
    gate_id: Option<GateId>,
    responses: Vec<GateRequest>,
}

impl GateScript {
    pub fn new(
        subscriber: IpAddr,
        service_class: &str,
        direction: Direction,
    ) -> Result<Self, Error> {
        let template = GateRequest {
            amid: Some(Amid {
                app_type: APP_TYPE,
                app_mgr_tag: APP_MGR_TAG,
            }),
            subscriber_id: Some(SubscriberId(subscriber)),
            gate_spec: Some(GateSpec::new(direction)),
            classifiers: vec![legacy_classifier(subscriber)],
            traffic_profile: Some(TrafficProfile::service_class_name(ENVELOPE, service_class)?),
            ..GateRequest::default()
        };

        Ok(Self {
            template,
            trans_id: 0,
            step: Step::AwaitingRequest,
            handle: None,
            gate_id: None,
            responses: Vec::new(),
        })
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn gate_id(&self) -> Option<GateId> {
        self.gate_id
    }

    /// Every gate response the CMTS reported, in order.
    pub fn responses(&self) -> &[GateRequest] {
        &self.responses
    }

    fn send(
        &mut self,
        command: GateCommand,
        handler: &mut PdpHandler,
        write: &mut Vec<Packet>,
    ) -> Result<(), PdpError> {
        let handle = match &self.handle {
            Some(handle) => handle.clone(),
            None => return Ok(()),
        };

        self.trans_id = self.trans_id.wrapping_add(1);
        let transaction_id = Some(TransactionId {
            trans_id: self.trans_id,
            gate_command: command,
        });
        let request = match command {
            GateCommand::Set => GateRequest {
                transaction_id,
                ..self.template.clone()
            },
            // Queries and deletes only name the gate
            _ => GateRequest {
                transaction_id,
                amid: self.template.amid,
                subscriber_id: self.template.subscriber_id,
                gate_id: self.gate_id,
                ..GateRequest::default()
            },
        };

        info!("sending gate {:?} for {:?}", command, handle);
        handler.install(&handle, Data::new(request.to_bytes()?), write)
    }

    fn report(
        &mut self,
        client_si: Option<&Data>,
        handler: &mut PdpHandler,
        write: &mut Vec<Packet>,
    ) -> Result<Control, PdpError> {
        let response = match client_si.map(|data| GateRequest::parse(data.as_slice())) {
            Some(Ok(response)) => response,
            Some(Err(error)) => {
                warn!("undecodable gate response: {}", error);
                self.step = Step::Done;
                return Ok(Control::Close);
            }
            None => {
                warn!("report carried no gate response");
                self.step = Step::Done;
                return Ok(Control::Close);
            }
        };

        if let Some(error) = response.error {
            warn!(
                "gate {:?} failed: {} (subcode {:#06x})",
                self.step,
                error.code.description(),
                error.subcode
            );
        }
        let command = response.command();
        if command == Some(GateCommand::SetAck) {
            self.gate_id = response.gate_id;
        }
        self.responses.push(response);

        match (self.step, command) {
            (Step::Set, Some(GateCommand::SetAck)) => {
                info!("gate {:?} committed", self.gate_id);
                self.send(GateCommand::Info, handler, write)?;
                self.step = Step::Info;
                Ok(Control::Continue)
            }
            (Step::Info, Some(GateCommand::InfoAck)) => {
                self.send(GateCommand::Delete, handler, write)?;
                self.step = Step::Delete;
                Ok(Control::Continue)
            }
            (Step::Delete, Some(GateCommand::DeleteAck)) => {
                info!("gate {:?} deleted", self.gate_id);
                self.step = Step::Done;
                Ok(Control::Close)
            }
            (step, command) => {
                warn!("unexpected gate response {:?} in step {:?}", command, step);
                self.step = Step::Done;
                Ok(Control::Close)
            }
        }
    }
}

impl PolicyDecider for GateScript {
    fn inform(
        &mut self,
        inform: &PdpInform,
        handler: &mut PdpHandler,
        write: &mut Vec<Packet>,
    ) -> Result<Control, PdpError> {
        match inform {
            PdpInform::Opened { pep_id, .. } => {
                info!("CMTS {:?} connected", pep_id);
                Ok(Control::Continue)
            }
            PdpInform::Request { handle, .. } if self.step == Step::AwaitingRequest => {
                self.handle = Some(handle.clone());
                self.send(GateCommand::Set, handler, write)?;
                self.step = Step::Set;
                Ok(Control::Continue)
            }
            PdpInform::Report {
                handle,
                client_si,
                ..
            } if self.handle.as_ref() == Some(handle) =>
                self.report(client_si.as_ref(), handler, write),
            PdpInform::Deleted { handle, reason } => {
                warn!("CMTS deleted {:?}: {}", handle, reason.code.description());
                self.step = Step::Done;
                Ok(Control::Close)
            }
            _ => Ok(Control::Continue),
        }
    }
}

/// Matches all traffic to and from `subscriber`.
fn legacy_classifier(subscriber: IpAddr) -> Classifier {
    let address = match subscriber {
        IpAddr::V4(v4) => v4.octets(),
        IpAddr::V6(_) => [0; 4],
    };

    let mut data = Vec::with_capacity(20);
    // Protocol 256 matches any protocol
    data.extend_from_slice(&256u16.to_be_bytes());
    // ToS field and mask
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(&address);
    data.extend_from_slice(&[0; 4]);
    // Source and destination ports
    data.extend_from_slice(&[0; 4]);
    // Priority, then reserved
    data.extend_from_slice(&[64, 0, 0, 0]);

    Classifier {
        s_type: LEGACY_CLASSIFIER,
        data: Data::new(data),
    }
}
