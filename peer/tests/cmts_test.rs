use common::messages::{
    cops::Handle,
    pcmm::{
        Amid,
        Classifier,
        Direction,
        GateCommand,
        GateId,
        GateRequest,
        GateSpec,
        GateStateKind,
        PcmmError,
        PcmmErrorCode,
        SNum,
        SubscriberId,
        TrafficProfile,
        TransactionId,
    },
    Data,
};
use peer::{
    cmts::{CmtsConfig, CmtsProcessor},
    pep_handler::{Applied, DecisionProcessor},
};
use std::{net::IpAddr, sync::Arc};

fn subscriber() -> IpAddr {
    "10.32.110.2".parse().unwrap()
}

fn processor() -> CmtsProcessor {
    let mut config = CmtsConfig {
        max_classifiers: 4,
        ..CmtsConfig::default()
    };
    config.upstream_service_classes.insert("extrm_up".to_string());
    config.downstream_service_classes.insert("extrm_dn".to_string());
    config.cm_status.insert(subscriber(), true);
    config.cm_status.insert("10.32.110.3".parse().unwrap(), false);
    CmtsProcessor::new(Arc::new(config))
}

fn classifier() -> Classifier {
    Classifier {
        s_type: 1,
        data: Data::new(vec![0; 20]),
    }
}

fn gate_set() -> GateRequest {
    GateRequest {
        transaction_id: Some(TransactionId {
            trans_id: 1,
            gate_command: GateCommand::Set,
        }),
        amid: Some(Amid {
            app_type: 1,
            app_mgr_tag: 2,
        }),
        subscriber_id: Some(SubscriberId(subscriber())),
        gate_spec: Some(GateSpec::new(Direction::Upstream)),
        classifiers: vec![classifier()],
        traffic_profile: Some(TrafficProfile::service_class_name(7, "extrm_up").unwrap()),
        ..GateRequest::default()
    }
}

fn follow_up(command: GateCommand, gate_id: GateId) -> GateRequest {
    GateRequest {
        transaction_id: Some(TransactionId {
            trans_id: 2,
            gate_command: command,
        }),
        gate_id: Some(gate_id),
        ..gate_set()
    }
}

fn rejected(processor: &mut CmtsProcessor, request: &GateRequest) -> GateRequest {
    match processor.process(request) {
        Err(response) => response,
        Ok(response) => panic!("request accepted: {:?}", response),
    }
}

fn committed(processor: &mut CmtsProcessor) -> GateId {
    let response = processor.process(&gate_set()).unwrap();
    response.gate_id.expect("no gate id")
}

#[test]
fn test_gate_set() {
    let mut processor = processor();

    let response = processor.process(&gate_set()).unwrap();

    assert_eq!(
        response.transaction_id,
        Some(TransactionId {
            trans_id: 1,
            gate_command: GateCommand::SetAck,
        })
    );
    assert_eq!(response.amid, gate_set().amid);
    assert_eq!(response.subscriber_id, gate_set().subscriber_id);
    let gate_id = response.gate_id.expect("no gate id");
    assert_ne!(gate_id, GateId(0));
    assert!(response.error.is_none());

    assert_eq!(processor.gate_count(), 1);
    assert_eq!(
        processor.gate(&gate_id).and_then(|gate| gate.gate_id),
        Some(gate_id)
    );
}

#[test]
fn test_gate_ids_are_unique() {
    let mut processor = processor();

    let first = committed(&mut processor);
    let second = committed(&mut processor);

    assert_ne!(first, second);
    assert_eq!(processor.gate_count(), 2);
}

#[test]
fn test_gate_info() {
    let mut processor = processor();
    let gate_id = committed(&mut processor);

    let response = processor
        .process(&follow_up(GateCommand::Info, gate_id))
        .unwrap();

    assert_eq!(response.command(), Some(GateCommand::InfoAck));
    assert_eq!(response.gate_id, Some(gate_id));
    assert_eq!(response.gate_spec, Some(GateSpec::new(Direction::Upstream)));
    assert_eq!(response.classifiers, vec![classifier()]);
    assert_eq!(response.traffic_profile, gate_set().traffic_profile);
    assert!(response.gate_time_info.is_some());
    assert!(response.gate_usage_info.is_some());
    assert_eq!(
        response.gate_state.map(|state| state.state),
        Some(GateStateKind::Committed)
    );
}

#[test]
fn test_gate_delete() {
    let mut processor = processor();
    let gate_id = committed(&mut processor);

    let response = processor
        .process(&follow_up(GateCommand::Delete, gate_id))
        .unwrap();
    assert_eq!(response.command(), Some(GateCommand::DeleteAck));
    assert_eq!(response.gate_id, Some(gate_id));
    assert_eq!(processor.gate_count(), 0);

    let response = rejected(&mut processor, &follow_up(GateCommand::Delete, gate_id));
    assert_eq!(response.command(), Some(GateCommand::DeleteErr));
    assert_eq!(
        response.error,
        Some(PcmmError::new(PcmmErrorCode::UnknownGateId, 0))
    );
}

#[test]
fn test_info_for_unknown_gate() {
    let mut processor = processor();

    let response = rejected(&mut processor, &follow_up(GateCommand::Info, GateId(42)));

    assert_eq!(response.command(), Some(GateCommand::InfoErr));
    assert_eq!(response.gate_id, Some(GateId(42)));
    assert_eq!(
        response.error.map(|error| error.code),
        Some(PcmmErrorCode::UnknownGateId)
    );
}

#[test]
fn test_missing_transaction_id() {
    let mut processor = processor();
    let request = GateRequest {
        transaction_id: None,
        ..gate_set()
    };

    let response = rejected(&mut processor, &request);

    assert_eq!(response.command(), Some(GateCommand::CmdErr));
    assert_eq!(response.error, Some(PcmmError::missing(SNum::TransactionId, 1)));
}

#[test]
fn test_unknown_gate_command() {
    let mut processor = processor();
    let request = GateRequest {
        transaction_id: Some(TransactionId {
            trans_id: 9,
            gate_command: GateCommand::RptState,
        }),
        ..gate_set()
    };

    let response = rejected(&mut processor, &request);

    assert_eq!(
        response.transaction_id,
        Some(TransactionId {
            trans_id: 9,
            gate_command: GateCommand::CmdErr,
        })
    );
    assert_eq!(
        response.error.map(|error| error.code),
        Some(PcmmErrorCode::UnknownGateCommand)
    );
}

#[test]
fn test_set_missing_objects() {
    let mut processor = processor();

    let cases = [
        (
            GateRequest {
                traffic_profile: None,
                ..gate_set()
            },
            PcmmError::missing(SNum::TrafficProfile, 0),
        ),
        (
            GateRequest {
                classifiers: Vec::new(),
                ..gate_set()
            },
            PcmmError::missing(SNum::Classifiers, 0),
        ),
        (
            GateRequest {
                gate_spec: None,
                ..gate_set()
            },
            PcmmError::missing(SNum::GateSpec, 1),
        ),
        (
            GateRequest {
                amid: None,
                ..gate_set()
            },
            PcmmError::missing(SNum::Amid, 1),
        ),
        (
            GateRequest {
                subscriber_id: None,
                ..gate_set()
            },
            PcmmError::missing(SNum::SubscriberId, 0),
        ),
    ];

    for (request, error) in cases.iter() {
        let response = rejected(&mut processor, request);
        assert_eq!(response.command(), Some(GateCommand::SetErr));
        assert_eq!(response.error, Some(*error));
    }
    assert_eq!(processor.gate_count(), 0);
}

#[test]
fn test_set_with_gate_id() {
    let mut processor = processor();
    let request = GateRequest {
        gate_id: Some(GateId(5)),
        ..gate_set()
    };

    let response = rejected(&mut processor, &request);

    assert_eq!(response.error, Some(PcmmError::missing(SNum::GateId, 1)));
    // A SetErr never carries a gate id
    assert!(response.gate_id.is_none());
}

#[test]
fn test_info_without_gate_id() {
    let mut processor = processor();
    let request = GateRequest {
        transaction_id: Some(TransactionId {
            trans_id: 3,
            gate_command: GateCommand::Info,
        }),
        ..gate_set()
    };

    let response = rejected(&mut processor, &request);

    assert_eq!(response.command(), Some(GateCommand::InfoErr));
    assert_eq!(response.error, Some(PcmmError::missing(SNum::GateId, 1)));
}

#[test]
fn test_undefined_service_class() {
    let mut processor = processor();

    // Configured, but only downstream
    let request = GateRequest {
        traffic_profile: Some(TrafficProfile::service_class_name(7, "extrm_dn").unwrap()),
        ..gate_set()
    };
    let response = rejected(&mut processor, &request);
    assert_eq!(
        response.error,
        Some(PcmmError::new(PcmmErrorCode::UndefinedServiceClassName, 0))
    );

    let request = GateRequest {
        gate_spec: Some(GateSpec::new(Direction::Downstream)),
        traffic_profile: Some(TrafficProfile::service_class_name(7, "extrm_dn").unwrap()),
        ..gate_set()
    };
    assert!(processor.process(&request).is_ok());
}

#[test]
fn test_unsupported_traffic_profile() {
    let mut processor = processor();
    let request = GateRequest {
        traffic_profile: Some(TrafficProfile::Other {
            s_type: 1,
            data: Data::new(vec![0; 24]),
        }),
        ..gate_set()
    };

    let response = rejected(&mut processor, &request);

    assert_eq!(
        response.error.map(|error| error.code),
        Some(PcmmErrorCode::OtherUnspecified)
    );
}

#[test]
fn test_too_many_classifiers() {
    let mut processor = processor();
    let request = GateRequest {
        classifiers: vec![classifier(); 5],
        ..gate_set()
    };

    let response = rejected(&mut processor, &request);

    assert_eq!(
        response.error,
        Some(PcmmError::new(PcmmErrorCode::NumberOfClassifiers, 4))
    );
}

#[test]
fn test_subscriber_offline() {
    let mut processor = processor();

    for address in ["10.32.110.3", "192.168.1.1"] {
        let request = GateRequest {
            subscriber_id: Some(SubscriberId(address.parse().unwrap())),
            ..gate_set()
        };
        let response = rejected(&mut processor, &request);
        assert_eq!(
            response.error,
            Some(PcmmError::new(PcmmErrorCode::InvalidSubscriberId, 0))
        );
    }
}

#[test]
fn test_unauthorized_amid() {
    let mut processor = processor();
    let gate_id = committed(&mut processor);
    let request = GateRequest {
        amid: Some(Amid {
            app_type: 1,
            app_mgr_tag: 3,
        }),
        ..follow_up(GateCommand::Delete, gate_id)
    };

    let response = rejected(&mut processor, &request);

    assert_eq!(
        response.error,
        Some(PcmmError::new(PcmmErrorCode::UnauthorizedAmid, 0))
    );
    assert_eq!(processor.gate_count(), 1);
}

#[test]
fn test_install_decision() {
    let mut processor = processor();
    let handle = Handle::new("h1");
    let payload = Data::new(gate_set().to_bytes().unwrap());

    let response = match processor.install(&handle, Some(&payload)) {
        Applied::Success(Some(response)) => response,
        _ => panic!("gate set failed"),
    };
    let response = GateRequest::parse(response.as_slice()).unwrap();
    assert_eq!(response.command(), Some(GateCommand::SetAck));
    assert!(response.gate_id.is_some());
}

#[test]
fn test_install_decision_rejected() {
    let mut processor = processor();
    let handle = Handle::new("h1");
    let payload = Data::new(
        GateRequest {
            traffic_profile: None,
            ..gate_set()
        }
        .to_bytes()
        .unwrap(),
    );

    let response = match processor.install(&handle, Some(&payload)) {
        Applied::Failure(Some(response)) => response,
        _ => panic!("gate set succeeded"),
    };
    let response = GateRequest::parse(response.as_slice()).unwrap();
    assert_eq!(response.command(), Some(GateCommand::SetErr));
    assert_eq!(
        response.error,
        Some(PcmmError::missing(SNum::TrafficProfile, 0))
    );
}

#[test]
fn test_install_without_gate_request() {
    let mut processor = processor();
    let handle = Handle::new("h1");

    assert!(matches!(
        processor.install(&handle, None),
        Applied::Failure(None)
    ));
    assert!(matches!(
        processor.install(&handle, Some(&Data::from("junk"))),
        Applied::Failure(None)
    ));
    assert!(matches!(
        processor.remove(&handle, None),
        Applied::Success(None)
    ));
}
