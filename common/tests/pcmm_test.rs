use common::messages::{pcmm::*, Error};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[test]
fn test_gate_set() {
    let bytes = include_bytes!("binary/pcmm/gate_set.bin");
    let gate = GateRequest::parse(bytes).unwrap();

    assert_eq!(gate.command(), Some(GateCommand::Set));
    assert_eq!(gate.transaction_id.unwrap().trans_id, 1);
    assert_eq!(
        gate.amid,
        Some(Amid {
            app_type: 1,
            app_mgr_tag: 2
        })
    );
    assert_eq!(
        gate.subscriber_id,
        Some(SubscriberId(IpAddr::V4(Ipv4Addr::new(10, 32, 110, 2))))
    );
    assert!(gate.gate_id.is_none());

    let spec = gate.gate_spec.unwrap();
    assert_eq!(spec.direction, Direction::Upstream);
    assert_eq!(spec.tos_mask, 0xff);
    assert_eq!(spec.t1, 300);

    assert_eq!(gate.classifiers.len(), 1);
    assert_eq!(gate.classifiers[0].data.as_slice(), &[0x06, 0x18, 0x00, 0x00]);

    match gate.traffic_profile.as_ref().unwrap() {
        TrafficProfile::ServiceClassName { envelope, name } => {
            assert_eq!(*envelope, 7);
            assert_eq!(name, "extrm_up");
        }
        profile => panic!("expected service class name, got {:?}", profile),
    }

    assert_eq!(gate.to_bytes().unwrap(), bytes);
}

#[test]
fn test_version_info() {
    let bytes = include_bytes!("binary/pcmm/version_info.bin");
    assert_eq!(VersionInfo::default().to_bytes().unwrap(), bytes);
    let gate = GateRequest::parse(bytes).unwrap();
    assert_eq!(
        gate.version_info,
        Some(VersionInfo { major: 5, minor: 0 })
    );
}

#[test]
fn test_gate_response_objects() {
    let gate = GateRequest {
        transaction_id: Some(TransactionId {
            trans_id: 3,
            gate_command: GateCommand::InfoAck,
        }),
        subscriber_id: Some(SubscriberId(IpAddr::V6(Ipv6Addr::LOCALHOST))),
        gate_id: Some(GateId(0xdeadbeef)),
        gate_time_info: Some(GateTimeInfo(42)),
        gate_usage_info: Some(GateUsageInfo(1 << 40)),
        gate_state: Some(GateState {
            state: GateStateKind::Committed,
            reason: GateStateReason::Other,
        }),
        ..Default::default()
    };
    let bytes = gate.to_bytes().unwrap();
    assert_eq!(bytes.len() % 4, 0);
    // TransactionID leads
    assert_eq!(&bytes[.. 8], &[0x00, 0x08, 0x01, 0x01, 0x00, 0x03, 0x00, 0x08]);
    // IPv6 subscriber uses S-Type 2
    assert_eq!(&bytes[8 .. 12], &[0x00, 0x14, 0x03, 0x02]);
    assert_eq!(GateRequest::parse(&bytes).unwrap(), gate);
}

#[test]
fn test_error_object() {
    let gate = GateRequest {
        error: Some(PcmmError::missing(SNum::GateSpec, 1)),
        ..Default::default()
    };
    let bytes = gate.to_bytes().unwrap();
    assert_eq!(bytes, [0x00, 0x08, 0x0e, 0x01, 0x00, 0x06, 0x05, 0x01]);
    let error = GateRequest::parse(&bytes).unwrap().error.unwrap();
    assert_eq!(error.code, PcmmErrorCode::MissingRequiredObject);
    assert_eq!(error.code.description(), "Missing Required Object");
}

#[test]
fn test_unknown_objects_skipped() {
    // An opaque-data object followed by a GateID
    let bytes = [
        0x00, 0x08, 0x0b, 0x01, 0xca, 0xfe, 0xba, 0xbe, 0x00, 0x08, 0x04, 0x01, 0x00, 0x00, 0x00,
        0x2a,
    ];
    let gate = GateRequest::parse(&bytes).unwrap();
    assert_eq!(gate.gate_id, Some(GateId(42)));
}

#[test]
fn test_bad_length() {
    let err = GateRequest::parse(&[0x00, 0x10, 0x04, 0x01, 0x00, 0x00, 0x00, 0x2a]).unwrap_err();
    assert!(matches!(err, Error::BadObjectLength { c_num: 4, length: 16 }));

    let err = GateRequest::parse(&[0x00, 0x02, 0x04, 0x01]).unwrap_err();
    assert!(matches!(err, Error::BadObjectLength { length: 2, .. }));
}

#[test]
fn test_service_class_name_length() {
    assert!(TrafficProfile::service_class_name(0, "a").is_err());
    assert!(TrafficProfile::service_class_name(0, "a".repeat(17)).is_err());
    assert!(TrafficProfile::service_class_name(7, "gold").is_ok());
}
