//! Gate control as a CMTS does it: PCMM gate requests arrive inside COPS decisions and are
//! answered inside the ClientSI of the report.

use crate::{
    helpers::random::random_u32,
    pep_handler::{Applied, DecisionProcessor},
    request_state::RequestStatus,
};
use common::messages::{
    cops::Handle,
    pcmm::{
        Direction,
        GateCommand,
        GateId,
        GateRequest,
        GateState,
        GateStateKind,
        GateStateReason,
        GateTimeInfo,
        GateUsageInfo,
        PcmmError,
        PcmmErrorCode,
        SNum,
        TrafficProfile,
        TransactionId,
    },
    Data,
};
use log::{debug, error, info, warn};
use std::{
    collections::{HashMap, HashSet},
    net::IpAddr,
    sync::Arc,
    time::Instant,
};

/// What the emulated CMTS supports.
#[derive(Debug, Clone, Default)]
pub struct CmtsConfig {
    pub upstream_service_classes: HashSet<String>,
    pub downstream_service_classes: HashSet<String>,
    /// Cable modems by subscriber address, and whether each is online.
    pub cm_status: HashMap<IpAddr, bool>,
    pub max_classifiers: usize,
}

impl CmtsConfig {
    pub fn service_classes(&self, direction: Direction) -> Option<&HashSet<String>> {
        match direction {
            Direction::Upstream => Some(&self.upstream_service_classes),
            Direction::Downstream => Some(&self.downstream_service_classes),
            Direction::Unknown => None,
        }
    }

    pub fn is_modem_online(&self, subscriber: &IpAddr) -> bool {
        self.cm_status.get(subscriber).copied().unwrap_or(false)
    }
}

struct Gate {
    request: GateRequest,
    committed_at: Instant,
    kilobytes: u64,
}

/// The gates installed over one COPS connection.
pub struct CmtsProcessor {
    config: Arc<CmtsConfig>,
    gates: HashMap<GateId, Gate>,
}

impl CmtsProcessor {
    pub fn new(config: Arc<CmtsConfig>) -> Self {
        Self {
            config,
            gates: HashMap::new(),
        }
    }

    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    pub fn gate(&self, gate_id: &GateId) -> Option<&GateRequest> {
        self.gates.get(gate_id).map(|gate| &gate.request)
    }

    /// Evaluates one gate request. The response is what goes back to the policy server;
    /// `Err` means it reports a PCMM error.
    pub fn process(&mut self, request: &GateRequest) -> Result<GateRequest, GateRequest> {
        let command = request.command();
        let trans_id = request.transaction_id.map(|id| id.trans_id).unwrap_or(0);

        let (ack, err) = match command {
            Some(GateCommand::Set) => (GateCommand::SetAck, GateCommand::SetErr),
            Some(GateCommand::Info) => (GateCommand::InfoAck, GateCommand::InfoErr),
            Some(GateCommand::Delete) => (GateCommand::DeleteAck, GateCommand::DeleteErr),
            Some(command) => {
                warn!("unsupported gate command {:?}", command);
                return Err(self.error_response(
                    request,
                    trans_id,
                    GateCommand::CmdErr,
                    PcmmError::new(PcmmErrorCode::UnknownGateCommand, 0),
                ));
            }
            None => (GateCommand::CmdErr, GateCommand::CmdErr),
        };

        if let Some(error) = self.check(request) {
            info!("gate {:?} rejected: {}", command, error.code.description());
            return Err(self.error_response(request, trans_id, err, error));
        }

        let mut response = GateRequest {
            transaction_id: Some(TransactionId {
                trans_id,
                gate_command: ack,
            }),
            amid: request.amid,
            subscriber_id: request.subscriber_id,
            ..GateRequest::default()
        };

        match command {
            Some(GateCommand::Set) => {
                let gate_id = self.unused_gate_id();
                self.gates.insert(gate_id, Gate {
                    request: GateRequest {
                        gate_id: Some(gate_id),
                        ..request.clone()
                    },
                    committed_at: Instant::now(),
                    kilobytes: 0,
                });
                info!("gate {:?} committed for {:?}", gate_id, request.subscriber_id);
                response.gate_id = Some(gate_id);
            }
            Some(GateCommand::Info) => {
                // Checked above: an info request names an installed gate
                if let Some(gate) = request.gate_id.and_then(|id| self.gates.get_mut(&id)) {
                    gate.kilobytes += u64::from(random_u32().unwrap_or(0) % 2000);
                    let elapsed = gate.committed_at.elapsed().as_secs();

                    response.gate_id = request.gate_id;
                    response.gate_spec = gate.request.gate_spec;
                    response.classifiers = gate.request.classifiers.clone();
                    response.traffic_profile = gate.request.traffic_profile.clone();
                    response.gate_time_info =
                        Some(GateTimeInfo(u32::try_from(elapsed).unwrap_or(u32::MAX)));
                    response.gate_usage_info = Some(GateUsageInfo(gate.kilobytes));
                    response.gate_state = Some(committed());
                }
            }
            Some(GateCommand::Delete) => {
                if let Some(gate_id) = request.gate_id {
                    self.gates.remove(&gate_id);
                    info!("gate {:?} deleted", gate_id);
                }
                response.gate_id = request.gate_id;
                response.gate_state = Some(committed());
            }
            _ => {}
        }

        Ok(response)
    }

    fn check(&self, request: &GateRequest) -> Option<PcmmError> {
        self.check_missing(request)
            .or_else(|| self.check_invalid(request))
    }

    fn check_missing(&self, request: &GateRequest) -> Option<PcmmError> {
        let command = match request.transaction_id {
            Some(id) => id.gate_command,
            None => return Some(PcmmError::missing(SNum::TransactionId, 1)),
        };

        if command == GateCommand::Set {
            if request.gate_id.is_some() {
                return Some(PcmmError::missing(SNum::GateId, 1));
            }
            if request.traffic_profile.is_none() {
                return Some(PcmmError::missing(SNum::TrafficProfile, 0));
            }
            if request.classifiers.is_empty() {
                return Some(PcmmError::missing(SNum::Classifiers, 0));
            }
            match request.gate_spec {
                None => return Some(PcmmError::missing(SNum::GateSpec, 1)),
                Some(spec) if spec.direction == Direction::Unknown =>
                    return Some(PcmmError::new(PcmmErrorCode::InvalidField, 0)),
                Some(_) => {}
            }
        } else if request.gate_id.is_none() {
            return Some(PcmmError::missing(SNum::GateId, 1));
        }

        if request.amid.is_none() {
            return Some(PcmmError::missing(SNum::Amid, 1));
        }
        if request.subscriber_id.is_none() {
            return Some(PcmmError::missing(SNum::SubscriberId, 0));
        }
        None
    }

    fn check_invalid(&self, request: &GateRequest) -> Option<PcmmError> {
        match request.command() {
            Some(GateCommand::Info) | Some(GateCommand::Delete) => {
                let known = request
                    .gate_id
                    .map(|id| self.gates.contains_key(&id))
                    .unwrap_or(false);
                if !known {
                    return Some(PcmmError::new(PcmmErrorCode::UnknownGateId, 0));
                }
            }
            _ => {
                match &request.traffic_profile {
                    Some(TrafficProfile::ServiceClassName { name, .. }) => {
                        let supported = request
                            .gate_spec
                            .and_then(|spec| self.config.service_classes(spec.direction))
                            .map(|names| names.contains(name))
                            .unwrap_or(false);
                        if !supported {
                            return Some(PcmmError::new(
                                PcmmErrorCode::UndefinedServiceClassName,
                                0,
                            ));
                        }
                    }
                    _ => {
                        error!("only service class name traffic profiles are supported");
                        return Some(PcmmError::new(PcmmErrorCode::OtherUnspecified, 0));
                    }
                }

                if request.classifiers.len() > self.config.max_classifiers {
                    return Some(PcmmError::new(
                        PcmmErrorCode::NumberOfClassifiers,
                        u16::try_from(self.config.max_classifiers).unwrap_or(u16::MAX),
                    ));
                }
            }
        }

        let online = request
            .subscriber_id
            .map(|id| self.config.is_modem_online(&id.0))
            .unwrap_or(false);
        if !online {
            return Some(PcmmError::new(PcmmErrorCode::InvalidSubscriberId, 0));
        }

        // Only the application manager that created a gate may touch it
        let existing = request.gate_id.and_then(|id| self.gates.get(&id));
        if let Some(gate) = existing {
            if gate.request.amid != request.amid {
                return Some(PcmmError::new(PcmmErrorCode::UnauthorizedAmid, 0));
            }
        }
        None
    }

    fn error_response(
        &self,
        request: &GateRequest,
        trans_id: u16,
        command: GateCommand,
        error: PcmmError,
    ) -> GateRequest {
        let gate_id = match command {
            GateCommand::SetErr => None,
            _ => request.gate_id,
        };
        GateRequest {
            transaction_id: Some(TransactionId {
                trans_id,
                gate_command: command,
            }),
            amid: request.amid,
            subscriber_id: request.subscriber_id,
            gate_id,
            error: Some(error),
            ..GateRequest::default()
        }
    }

    fn unused_gate_id(&self) -> GateId {
        let mut candidate = random_u32().unwrap_or(1);
        while candidate == 0 || self.gates.contains_key(&GateId(candidate)) {
            candidate = candidate.wrapping_add(1);
        }
        GateId(candidate)
    }

    fn apply(&mut self, handle: &Handle, payload: Option<&Data>) -> Applied {
        let payload = match payload {
            Some(payload) => payload,
            None => {
                warn!("decision for {:?} carried no gate request", handle);
                return Applied::Failure(None);
            }
        };
        let request = match GateRequest::parse(payload.as_slice()) {
            Ok(request) => request,
            Err(e) => {
                error!("could not parse gate request for {:?}: {}", handle, e);
                return Applied::Failure(None);
            }
        };
        debug!("gate request for {:?}: {:?}", handle, request);

        let (success, response) = match self.process(&request) {
            Ok(response) => (true, response),
            Err(response) => (false, response),
        };
        let data = match response.to_bytes() {
            Ok(bytes) => Some(Data::new(bytes)),
            Err(e) => {
                error!("could not encode gate response: {}", e);
                return Applied::Failure(None);
            }
        };

        if success {
            Applied::Success(data)
        } else {
            Applied::Failure(data)
        }
    }
}

fn committed() -> GateState {
    GateState {
        state: GateStateKind::Committed,
        reason: GateStateReason::Other,
    }
}

impl DecisionProcessor for CmtsProcessor {
    fn install(&mut self, handle: &Handle, payload: Option<&Data>) -> Applied {
        self.apply(handle, payload)
    }

    fn remove(&mut self, handle: &Handle, payload: Option<&Data>) -> Applied {
        match payload {
            Some(_) => self.apply(handle, payload),
            None => Applied::Success(None),
        }
    }

    fn closed(&mut self, handle: &Handle, status: RequestStatus) {
        debug!("request {:?} closed with {:?}", handle, status);
    }
}
