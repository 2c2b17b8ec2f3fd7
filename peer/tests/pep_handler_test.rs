mod helper;

use common::{
    constants::PCMM_CLIENT_TYPE,
    messages::{
        cops::{
            AcctTimer,
            ClientAccept,
            ClientClose,
            Command,
            CopsMessage,
            Decision,
            DecisionFlags,
            DecisionMessage,
            ErrorCode,
            ErrorObject,
            Handle,
            Integrity,
            KaTimer,
            Packet,
            Reason,
            ReasonCode,
            ReportType,
            SyncStateRequest,
        },
        pcmm::VersionInfo,
        Data,
    },
};
use helper::{context, open_handler, packet, Recorder};
use peer::{
    cmts::{CmtsConfig, CmtsProcessor},
    pep_handler::{Applied, PepError, PepHandler, PepInform, State},
    request_state::RequestStatus,
    InformEvent,
};
use std::sync::Arc;

fn install(handle: &str, gate: &str) -> Packet {
    packet(
        DecisionMessage::single(
            Handle::new(handle),
            context(),
            Command::Install,
            DecisionFlags::REQERROR,
            Some(Decision::ClientSi(Data::from(gate))),
        )
        .unwrap(),
    )
    .solicited()
}

fn reports(write: &[Packet]) -> Vec<(ReportType, Option<Data>)> {
    write
        .iter()
        .filter_map(|packet| match &packet.message {
            CopsMessage::Report(report) => Some((
                report.report_type,
                report.client_si.as_ref().map(|si| si.data.clone()),
            )),
            _ => None,
        })
        .collect()
}

#[test]
fn test_open_sends_version() {
    let mut handler = PepHandler::new(PCMM_CLIENT_TYPE, "CMTS", Recorder::default());
    let mut write = Vec::new();

    handler.open(&mut write).unwrap();
    assert_eq!(handler.state(), State::Opening);
    assert_eq!(write.len(), 1);

    let msg = match &write[0].message {
        CopsMessage::ClientOpen(msg) => msg,
        _ => panic!("wrong message returned: {:?}", write[0]),
    };
    assert_eq!(msg.pep_id.0.as_slice(), b"CMTS");
    let client_si = msg.client_si.as_ref().expect("no version info");
    assert_eq!(
        client_si.data.as_slice(),
        VersionInfo::default().to_bytes().unwrap().as_slice()
    );

    assert!(matches!(
        handler.open(&mut write),
        Err(PepError::WrongState(_, State::Opening))
    ));
}

#[test]
fn test_accept() {
    let mut handler = PepHandler::new(PCMM_CLIENT_TYPE, "CMTS", Recorder::default());
    let mut write = Vec::new();
    let mut events = Vec::new();
    handler.open(&mut write).unwrap();
    write.clear();

    handler
        .handle(
            packet(ClientAccept {
                ka_timer: KaTimer::new(5),
                acct_timer: Some(AcctTimer::new(60)),
                integrity: None,
            }),
            &mut write,
            &mut events,
        )
        .unwrap();

    assert_eq!(handler.state(), State::Open);
    assert_eq!(handler.ka_interval(), 5);
    assert_eq!(handler.acct_interval(), 60);
    assert!(write.is_empty());
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        InformEvent::PepInform(PepInform::Accepted {
            ka_interval: 5,
            acct_interval: 60
        })
    ));
}

#[test]
fn test_accept_without_keep_alive_timer() {
    let mut handler = PepHandler::new(PCMM_CLIENT_TYPE, "CMTS", Recorder::default());
    let mut write = Vec::new();
    handler.open(&mut write).unwrap();
    write.clear();

    // ClientAccept with no objects at all
    let error = match Packet::read(&[0x10, 0x07, 0x80, 0x0a, 0x00, 0x00, 0x00, 0x08]) {
        Err(error) => error,
        Ok(packet) => panic!("decoded {:?}", packet),
    };
    assert!(matches!(
        handler.decode_failed(error, &mut write),
        Err(PepError::MandatoryObjectMissing(_))
    ));

    assert_eq!(handler.state(), State::Closed);
    assert_eq!(write.len(), 1);
    let msg = match &write[0].message {
        CopsMessage::ClientClose(msg) => msg,
        _ => panic!("wrong message returned: {:?}", write[0]),
    };
    assert_eq!(msg.error.code, ErrorCode::MandatoryObjectMissing);
}

#[test]
fn test_accept_with_integrity() {
    let mut handler = PepHandler::new(PCMM_CLIENT_TYPE, "CMTS", Recorder::default());
    let mut write = Vec::new();
    let mut events = Vec::new();
    handler.open(&mut write).unwrap();
    write.clear();

    let result = handler.handle(
        packet(ClientAccept {
            ka_timer: KaTimer::new(5),
            acct_timer: None,
            integrity: Some(Integrity {
                key_id: 1,
                seq_num: 1,
                digest: vec![0; 16],
            }),
        }),
        &mut write,
        &mut events,
    );

    assert!(matches!(result, Err(PepError::UnsupportedObject(_))));
    assert_eq!(handler.state(), State::Closed);
    let msg = match &write[0].message {
        CopsMessage::ClientClose(msg) => msg,
        _ => panic!("wrong message returned: {:?}", write[0]),
    };
    assert_eq!(msg.error, ErrorObject::new(ErrorCode::UnknownObject, 0x1001));
}

#[test]
fn test_close_during_handshake() {
    let mut handler = PepHandler::new(PCMM_CLIENT_TYPE, "CMTS", Recorder::default());
    let mut write = Vec::new();
    let mut events = Vec::new();
    handler.open(&mut write).unwrap();
    write.clear();

    handler
        .handle(
            packet(ClientClose::new(ErrorCode::ShuttingDown, 0)),
            &mut write,
            &mut events,
        )
        .unwrap();

    assert_eq!(handler.state(), State::Closed);
    assert!(write.is_empty());
    assert!(matches!(
        events[0],
        InformEvent::PepInform(PepInform::Closed(ErrorObject {
            code: ErrorCode::ShuttingDown,
            ..
        }))
    ));
}

#[test]
fn test_wrong_message_during_handshake() {
    let mut handler = PepHandler::new(PCMM_CLIENT_TYPE, "CMTS", Recorder::default());
    let mut write = Vec::new();
    let mut events = Vec::new();
    handler.open(&mut write).unwrap();
    write.clear();

    let result = handler.handle(install("h1", "gate"), &mut write, &mut events);
    assert!(matches!(
        result,
        Err(PepError::WrongMessageForState(_, State::Opening))
    ));
    assert_eq!(handler.state(), State::Closed);
    assert!(matches!(write[0].message, CopsMessage::ClientClose(_)));
}

#[test]
fn test_install_success() {
    let mut handler = open_handler(Recorder::default());
    let handle = Handle::new("h1");
    let mut write = Vec::new();
    let mut events = Vec::new();
    assert_eq!(
        handler.request_state(&handle).unwrap().status(),
        RequestStatus::Requested
    );

    handler
        .handle(install("h1", "gate"), &mut write, &mut events)
        .unwrap();

    assert_eq!(reports(&write), vec![(ReportType::Success, None)]);
    assert!(write[0].header.is_solicited());
    assert_eq!(
        handler.request_state(&handle).unwrap().status(),
        RequestStatus::ReportSent
    );
    assert_eq!(handler.processor().installs, vec![(
        handle.clone(),
        Some(Data::from("gate"))
    )]);
    assert!(matches!(
        &events[0],
        InformEvent::PepInform(PepInform::DecisionApplied {
            report_type: ReportType::Success,
            ..
        })
    ));
}

#[test]
fn test_install_failure() {
    let mut handler = open_handler(Recorder::with_outcomes(vec![Applied::Failure(Some(
        Data::from("no gate"),
    ))]));
    let mut write = Vec::new();
    let mut events = Vec::new();

    handler
        .handle(install("h1", "gate"), &mut write, &mut events)
        .unwrap();

    assert_eq!(reports(&write), vec![(
        ReportType::Failure,
        Some(Data::from("no gate"))
    )]);
}

#[test]
fn test_install_without_error_reporting() {
    let mut handler = open_handler(Recorder::with_outcomes(vec![Applied::Failure(None)]));
    let mut write = Vec::new();
    let mut events = Vec::new();

    let decision = DecisionMessage::single(
        Handle::new("h1"),
        context(),
        Command::Install,
        DecisionFlags::empty(),
        None,
    )
    .unwrap();
    handler
        .handle(packet(decision).solicited(), &mut write, &mut events)
        .unwrap();

    assert_eq!(reports(&write), vec![(ReportType::Success, None)]);
    assert!(handler.processor().installs.is_empty());
}

#[test]
fn test_plain_install_skips_gate_evaluation() {
    let processor = CmtsProcessor::new(Arc::new(CmtsConfig::default()));
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
    handler
        .request(Handle::new("h1"), context(), Vec::new(), &mut write)
        .unwrap();
    write.clear();

    let decision = DecisionMessage::single(
        Handle::new("h1"),
        context(),
        Command::Install,
        DecisionFlags::empty(),
        None,
    )
    .unwrap();
    handler
        .handle(packet(decision), &mut write, &mut events)
        .unwrap();

    assert_eq!(reports(&write), vec![(ReportType::Success, None)]);
    assert_eq!(handler.processor().gate_count(), 0);
}

#[test]
fn test_decision_error_reports_failure() {
    let mut handler = open_handler(Recorder::default());
    let mut write = Vec::new();
    let mut events = Vec::new();

    let decision = DecisionMessage::error(
        Handle::new("h1"),
        ErrorObject::new(ErrorCode::FailProcess, 0),
    );
    handler
        .handle(packet(decision), &mut write, &mut events)
        .unwrap();

    assert_eq!(reports(&write), vec![(ReportType::Failure, None)]);
    assert!(handler.processor().installs.is_empty());
}

#[test]
fn test_decisions_reported_in_order() {
    let mut handler = open_handler(Recorder::with_outcomes(vec![
        Applied::Success(Some(Data::from("first"))),
        Applied::Failure(Some(Data::from("second"))),
    ]));
    let mut write = Vec::new();
    let mut events = Vec::new();

    handler
        .handle(install("h1", "a"), &mut write, &mut events)
        .unwrap();
    handler
        .handle(install("h1", "b"), &mut write, &mut events)
        .unwrap();

    assert_eq!(reports(&write), vec![
        (ReportType::Success, Some(Data::from("first"))),
        (ReportType::Failure, Some(Data::from("second"))),
    ]);
}

#[test]
fn test_decision_for_unknown_handle() {
    let mut handler = open_handler(Recorder::default());
    let mut write = Vec::new();
    let mut events = Vec::new();

    let result = handler.handle(install("nope", "gate"), &mut write, &mut events);
    assert!(matches!(result, Err(PepError::UnknownHandle(_))));
    assert!(write.is_empty());
    assert_eq!(handler.state(), State::Open);
}

#[test]
fn test_remove_request_state() {
    let mut handler = open_handler(Recorder::default());
    let handle = Handle::new("h1");
    let mut write = Vec::new();
    let mut events = Vec::new();

    let decision = DecisionMessage::single(
        handle.clone(),
        context(),
        Command::Remove,
        DecisionFlags::REQSTATE,
        None,
    )
    .unwrap();
    handler
        .handle(packet(decision), &mut write, &mut events)
        .unwrap();

    assert!(write.is_empty());
    assert!(handler.request_state(&handle).is_none());
    assert_eq!(handler.processor().closed, vec![(
        handle,
        RequestStatus::Deleted
    )]);
    assert!(matches!(
        &events[0],
        InformEvent::PepInform(PepInform::RequestDeleted(_))
    ));
}

#[test]
fn test_install_request_state() {
    let mut handler = open_handler(Recorder::default());
    let handle = Handle::new("h1");
    let mut write = Vec::new();
    let mut events = Vec::new();

    let decision = DecisionMessage::single(
        handle.clone(),
        context(),
        Command::Install,
        DecisionFlags::REQSTATE,
        None,
    )
    .unwrap();
    handler
        .handle(packet(decision), &mut write, &mut events)
        .unwrap();

    assert!(write.is_empty());
    assert_eq!(
        handler.request_state(&handle).unwrap().status(),
        RequestStatus::New
    );
}

#[test]
fn test_sync_unknown_handle() {
    let mut handler = open_handler(Recorder::default());
    let mut write = Vec::new();
    let mut events = Vec::new();

    handler
        .handle(
            packet(SyncStateRequest {
                handle: Some(Handle::new("nope")),
                integrity: None,
            }),
            &mut write,
            &mut events,
        )
        .unwrap();

    assert_eq!(write.len(), 1);
    let msg = match &write[0].message {
        CopsMessage::DeleteRequestState(msg) => msg,
        _ => panic!("wrong message returned: {:?}", write[0]),
    };
    assert_eq!(msg.handle, Handle::new("nope"));
    assert_eq!(msg.reason.code, ReasonCode::Unspecified);
}

#[test]
fn test_sync_all() {
    let mut handler = open_handler(Recorder::default());
    let handle = Handle::new("h1");
    let mut write = Vec::new();
    let mut events = Vec::new();

    handler
        .handle(packet(SyncStateRequest::default()), &mut write, &mut events)
        .unwrap();

    assert_eq!(write.len(), 2);
    let msg = match &write[0].message {
        CopsMessage::Request(msg) => msg,
        _ => panic!("wrong message returned: {:?}", write[0]),
    };
    assert_eq!(msg.handle, handle);
    assert!(matches!(write[1].message, CopsMessage::SyncStateComplete(_)));

    assert!(handler.is_synchronized());
    assert_eq!(
        handler.request_state(&handle).unwrap().status(),
        RequestStatus::SyncAll
    );
    assert!(matches!(
        events[0],
        InformEvent::PepInform(PepInform::SyncComplete)
    ));
}

#[test]
fn test_accounting_reports() {
    let mut handler = open_handler(Recorder::default());
    let handle = Handle::new("h1");
    let mut write = Vec::new();
    let mut events = Vec::new();

    // Nothing to account for before the first decision
    handler.accounting_reports(&mut write);
    assert!(write.is_empty());

    handler
        .handle(install("h1", "gate"), &mut write, &mut events)
        .unwrap();
    write.clear();

    handler.accounting_reports(&mut write);
    assert_eq!(reports(&write), vec![(
        ReportType::Accounting,
        Some(Data::from("usage"))
    )]);
    assert!(!write[0].header.is_solicited());
    assert_eq!(
        handler.request_state(&handle).unwrap().status(),
        RequestStatus::Accounting
    );
}

#[test]
fn test_delete_request() {
    let mut handler = open_handler(Recorder::default());
    let handle = Handle::new("h1");
    let mut write = Vec::new();

    handler
        .delete_request(&handle, Reason::new(ReasonCode::Management, 0), &mut write)
        .unwrap();

    let msg = match &write[0].message {
        CopsMessage::DeleteRequestState(msg) => msg,
        _ => panic!("wrong message returned: {:?}", write[0]),
    };
    assert_eq!(msg.reason.code, ReasonCode::Management);
    assert!(handler.request_state(&handle).is_none());
    assert!(matches!(
        handler.delete_request(&handle, Reason::new(ReasonCode::Management, 0), &mut write),
        Err(PepError::UnknownHandle(_))
    ));
}

#[test]
fn test_close_discards_requests() {
    let mut handler = open_handler(Recorder::default());
    let mut write = Vec::new();
    let mut events = Vec::new();

    handler
        .handle(
            packet(ClientClose::new(ErrorCode::ShuttingDown, 0)),
            &mut write,
            &mut events,
        )
        .unwrap();

    assert_eq!(handler.state(), State::Closed);
    assert_eq!(handler.handles().count(), 0);
    assert_eq!(handler.processor().closed, vec![(
        Handle::new("h1"),
        RequestStatus::ClosedConnection
    )]);
}

#[test]
fn test_keep_alive_timeout_discards_requests() {
    let mut handler = open_handler(Recorder::default());

    handler.connection_lost(RequestStatus::NoKeepAlive);

    assert_eq!(handler.state(), State::Closed);
    assert_eq!(handler.processor().closed, vec![(
        Handle::new("h1"),
        RequestStatus::NoKeepAlive
    )]);
}
