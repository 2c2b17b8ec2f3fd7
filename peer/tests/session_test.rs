mod helper;

use common::{
    constants::PCMM_CLIENT_TYPE,
    messages::{
        cops::{
            ClientOpen,
            ClientSi,
            CopsMessage,
            ErrorCode,
            Handle,
            Packet,
            PepId,
            ReportType,
        },
        Data,
    },
};
use helper::{packet, Recorder};
use io::{Connection, ShutdownSignal};
use peer::{
    pdp_handler::{PdpError, PdpHandler, PdpInform},
    pep_handler::{Applied, PepHandler},
    session::{Control, PdpSession, PepSession, PolicyDecider, SessionEnd},
};
use std::{
    net::TcpListener,
    thread,
    time::{Duration, Instant},
};

const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Both ends of a loopback connection: the accepted side first.
fn connection_pair() -> (Connection, Connection) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let connecting = Connection::connect(listener.local_addr().unwrap(), READ_TIMEOUT).unwrap();
    let (stream, _) = listener.accept().unwrap();
    (Connection::new(stream, READ_TIMEOUT).unwrap(), connecting)
}

fn recv(connection: &mut Connection) -> Packet {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(packet) = connection.recv().unwrap() {
            return packet;
        }
    }
    panic!("nothing received");
}

/// Installs a gate for every request and closes after the first report.
#[derive(Default)]
struct InstallOnce {
    reports: Vec<(ReportType, Option<Data>)>,
}

impl PolicyDecider for InstallOnce {
    fn inform(
        &mut self,
        inform: &PdpInform,
        handler: &mut PdpHandler,
        write: &mut Vec<Packet>,
    ) -> Result<Control, PdpError> {
        match inform {
            PdpInform::Request { handle, .. } => {
                handler.install(handle, "gate", write)?;
                Ok(Control::Continue)
            }
            PdpInform::Report {
                report_type,
                client_si,
                ..
            } => {
                self.reports.push((*report_type, client_si.clone()));
                Ok(Control::Close)
            }
            _ => Ok(Control::Continue),
        }
    }
}

#[test]
fn test_pep_and_pdp() {
    let (cmts, policy_server) = connection_pair();

    let pep = PepSession::new(
        cmts,
        PepHandler::new(
            PCMM_CLIENT_TYPE,
            "CMTS",
            Recorder::with_outcomes(vec![Applied::Success(Some(Data::from("installed")))]),
        ),
        ShutdownSignal::new(),
        Handle::new("h1"),
    );
    let pep = thread::spawn(move || pep.run());

    let pdp = PdpSession::new(
        policy_server,
        PdpHandler::new(PCMM_CLIENT_TYPE, 30, 0),
        InstallOnce::default(),
        ShutdownSignal::new(),
    );
    let (pdp_end, decider) = pdp.run();

    assert_eq!(pdp_end, SessionEnd::ClosedLocally);
    assert_eq!(pep.join().unwrap(), SessionEnd::ClosedByPeer);
    assert_eq!(decider.reports, vec![(
        ReportType::Success,
        Some(Data::from("installed"))
    )]);
}

#[test]
fn test_pdp_keep_alive_expiry() {
    let (accepted, mut pep) = connection_pair();

    let pdp = PdpSession::new(
        accepted,
        PdpHandler::new(PCMM_CLIENT_TYPE, 1, 0),
        InstallOnce::default(),
        ShutdownSignal::new(),
    );
    let pdp = thread::spawn(move || pdp.run());

    pep.send(&packet(ClientOpen {
        pep_id: PepId(Data::from("CMTS")),
        client_si: Some(ClientSi::signaled("version")),
        last_pdp_address: None,
        integrity: None,
    }))
    .unwrap();
    let accept = recv(&mut pep);
    assert!(matches!(accept.message, CopsMessage::ClientAccept(_)));

    // Stay silent past the keep-alive interval
    let (end, _) = pdp.join().unwrap();
    assert_eq!(end, SessionEnd::KeepAliveExpired);
}

#[test]
fn test_pep_shutdown() {
    let (cmts, mut policy_server) = connection_pair();
    let shutdown = ShutdownSignal::new();
    shutdown.trigger();

    let pep = PepSession::new(
        cmts,
        PepHandler::new(PCMM_CLIENT_TYPE, "CMTS", Recorder::default()),
        shutdown,
        Handle::new("h1"),
    );
    let end = pep.run();
    assert_eq!(end, SessionEnd::Stopped);

    let open = recv(&mut policy_server);
    assert!(matches!(open.message, CopsMessage::ClientOpen(_)));
    let close = match recv(&mut policy_server).message {
        CopsMessage::ClientClose(msg) => msg,
        message => panic!("wrong message returned: {:?}", message),
    };
    assert_eq!(close.error.code, ErrorCode::ShuttingDown);
}
