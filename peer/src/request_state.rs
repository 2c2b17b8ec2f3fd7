use common::messages::{
    cops::{ClientSi, Context, Handle, ReportType},
    Data,
};
use log::debug;

/// Where one client handle is in its request, decision and report exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Created,
    Requested,
    DecisionsReceived,
    ReportSent,
    /// The PDP asked for a resync and the request was sent again.
    Synchronizing,
    SyncAll,
    Deleted,
    /// The PDP installed the request state itself.
    New,
    ClosedConnection,
    NoKeepAlive,
    Accounting,
    Final,
}

/// Outcome of the decisions applied for one Decision message, waiting to be reported.
#[derive(Debug, Default)]
pub struct PendingReport {
    pub installs: usize,
    pub removes: usize,
    pub errors: usize,
    /// Payload for the report's ClientSI. The last decision that produced one wins.
    pub client_si: Option<Data>,
}

impl PendingReport {
    pub fn report_type(&self) -> ReportType {
        if self.errors > 0 {
            ReportType::Failure
        } else {
            ReportType::Success
        }
    }
}

#[derive(Debug)]
pub struct RequestState {
    handle: Handle,
    status: RequestStatus,
    context: Context,
    client_sis: Vec<ClientSi>,
    pending: PendingReport,
}

impl RequestState {
    pub fn new(handle: Handle, context: Context, client_sis: Vec<ClientSi>) -> Self {
        Self {
            handle,
            status: RequestStatus::Created,
            context,
            client_sis,
            pending: PendingReport::default(),
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn context(&self) -> Context {
        self.context
    }

    pub fn client_sis(&self) -> &[ClientSi] {
        &self.client_sis
    }

    pub fn pending(&self) -> &PendingReport {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut PendingReport {
        &mut self.pending
    }

    /// Hands back the accumulated outcome and starts a fresh one.
    pub fn take_pending(&mut self) -> PendingReport {
        std::mem::take(&mut self.pending)
    }

    pub fn set_status(&mut self, status: RequestStatus) {
        if self.status != status {
            debug!("request {:?}: {:?} -> {:?}", self.handle, self.status, status);
            self.status = status;
        }
    }
}
