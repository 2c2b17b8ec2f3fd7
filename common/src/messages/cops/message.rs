use super::{
    header::{check_total_len, MessageHeader, OpCode},
    objects::*,
};
use crate::{constants::COMMON_HEADER_LEN, messages::Error};
use std::io::{Cursor, Write};

/// The body of one message type: how it is assembled from decoded objects and the order it
/// writes them in.
pub trait MessageBody: Sized {
    const OP_CODE: OpCode;

    fn from_objects(objects: Vec<Object>) -> Result<Self, Error>;

    fn write_objects(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error>;
}

fn set<T>(slot: &mut Option<T>, value: T, op_code: OpCode, c_num: u8) -> Result<(), Error> {
    if slot.is_some() {
        return Err(Error::DuplicateObject {
            message: op_code.name(),
            c_num,
        });
    }
    *slot = Some(value);
    Ok(())
}

fn required<T>(slot: Option<T>, op_code: OpCode, object: &'static str) -> Result<T, Error> {
    slot.ok_or(Error::MandatoryObjectMissing {
        message: op_code.name(),
        object,
    })
}

fn unexpected(object: &Object, op_code: OpCode) -> Error {
    match object {
        Object::Unknown { c_num, c_type, .. } => Error::UnknownObject {
            c_num: *c_num,
            c_type: *c_type,
        },
        object => Error::UnexpectedObject {
            message: op_code.name(),
            c_num: object.c_num(),
        },
    }
}

fn write_opt<T: CopsObject>(
    object: &Option<T>,
    cursor: &mut Cursor<Vec<u8>>,
) -> Result<(), Error> {
    match object {
        Some(object) => object.write_object(cursor),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOpen {
    pub pep_id: PepId,
    pub client_si: Option<ClientSi>,
    pub last_pdp_address: Option<LastPdpAddress>,
    pub integrity: Option<Integrity>,
}

impl MessageBody for ClientOpen {
    const OP_CODE: OpCode = OpCode::ClientOpen;

    fn from_objects(objects: Vec<Object>) -> Result<Self, Error> {
        let (mut pep_id, mut client_si, mut last_pdp_address, mut integrity) =
            (None, None, None, None);
        for object in objects {
            let c_num = object.c_num();
            match object {
                Object::PepId(obj) => set(&mut pep_id, obj, Self::OP_CODE, c_num)?,
                Object::ClientSi(obj) => set(&mut client_si, obj, Self::OP_CODE, c_num)?,
                Object::LastPdpAddress(obj) => {
                    set(&mut last_pdp_address, obj, Self::OP_CODE, c_num)?
                }
                Object::Integrity(obj) => set(&mut integrity, obj, Self::OP_CODE, c_num)?,
                object => return Err(unexpected(&object, Self::OP_CODE)),
            }
        }

        Ok(Self {
            pep_id: required(pep_id, Self::OP_CODE, "PEPID")?,
            client_si,
            last_pdp_address,
            integrity,
        })
    }

    fn write_objects(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        self.pep_id.write_object(cursor)?;
        write_opt(&self.client_si, cursor)?;
        write_opt(&self.last_pdp_address, cursor)?;
        write_opt(&self.integrity, cursor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAccept {
    pub ka_timer: KaTimer,
    pub acct_timer: Option<AcctTimer>,
    pub integrity: Option<Integrity>,
}

impl MessageBody for ClientAccept {
    const OP_CODE: OpCode = OpCode::ClientAccept;

    fn from_objects(objects: Vec<Object>) -> Result<Self, Error> {
        let (mut ka_timer, mut acct_timer, mut integrity) = (None, None, None);
        for object in objects {
            let c_num = object.c_num();
            match object {
                Object::KaTimer(obj) => set(&mut ka_timer, obj, Self::OP_CODE, c_num)?,
                Object::AcctTimer(obj) => set(&mut acct_timer, obj, Self::OP_CODE, c_num)?,
                Object::Integrity(obj) => set(&mut integrity, obj, Self::OP_CODE, c_num)?,
                object => return Err(unexpected(&object, Self::OP_CODE)),
            }
        }

        Ok(Self {
            ka_timer: required(ka_timer, Self::OP_CODE, "Keep-Alive Timer")?,
            acct_timer,
            integrity,
        })
    }

    fn write_objects(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        self.ka_timer.write_object(cursor)?;
        write_opt(&self.acct_timer, cursor)?;
        write_opt(&self.integrity, cursor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientClose {
    pub error: ErrorObject,
    pub redirect: Option<PdpRedirect>,
    pub integrity: Option<Integrity>,
}

impl ClientClose {
    pub fn new(code: ErrorCode, subcode: u16) -> Self {
        Self {
            error: ErrorObject::new(code, subcode),
            redirect: None,
            integrity: None,
        }
    }
}

impl MessageBody for ClientClose {
    const OP_CODE: OpCode = OpCode::ClientClose;

    fn from_objects(objects: Vec<Object>) -> Result<Self, Error> {
        let (mut error, mut redirect, mut integrity) = (None, None, None);
        for object in objects {
            let c_num = object.c_num();
            match object {
                Object::Error(obj) => set(&mut error, obj, Self::OP_CODE, c_num)?,
                Object::PdpRedirect(obj) => set(&mut redirect, obj, Self::OP_CODE, c_num)?,
                Object::Integrity(obj) => set(&mut integrity, obj, Self::OP_CODE, c_num)?,
                object => return Err(unexpected(&object, Self::OP_CODE)),
            }
        }

        Ok(Self {
            error: required(error, Self::OP_CODE, "Error")?,
            redirect,
            integrity,
        })
    }

    fn write_objects(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        self.error.write_object(cursor)?;
        write_opt(&self.redirect, cursor)?;
        write_opt(&self.integrity, cursor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub handle: Handle,
    pub context: Context,
    pub in_interface: Option<InInterface>,
    pub out_interface: Option<OutInterface>,
    pub client_sis: Vec<ClientSi>,
    /// Local decisions grouped under the context they apply to, in wire order.
    pub local_decisions: Vec<(Context, Vec<LocalDecision>)>,
    pub integrity: Option<Integrity>,
}

impl Request {
    pub fn new(handle: Handle, context: Context) -> Self {
        Self {
            handle,
            context,
            in_interface: None,
            out_interface: None,
            client_sis: Vec::new(),
            local_decisions: Vec::new(),
            integrity: None,
        }
    }
}

impl MessageBody for Request {
    const OP_CODE: OpCode = OpCode::Request;

    fn from_objects(objects: Vec<Object>) -> Result<Self, Error> {
        let (mut handle, mut context, mut in_interface, mut out_interface, mut integrity) =
            (None, None, None, None, None);
        let mut client_sis = Vec::new();
        let mut local_decisions: Vec<(Context, Vec<LocalDecision>)> = Vec::new();

        for object in objects {
            let c_num = object.c_num();
            match object {
                Object::Handle(obj) => set(&mut handle, obj, Self::OP_CODE, c_num)?,
                // The first context is the request's own, later ones open a local decision group
                Object::Context(obj) if context.is_none() => context = Some(obj),
                Object::Context(obj) => local_decisions.push((obj, Vec::new())),
                Object::InInterface(obj) => set(&mut in_interface, obj, Self::OP_CODE, c_num)?,
                Object::OutInterface(obj) => set(&mut out_interface, obj, Self::OP_CODE, c_num)?,
                Object::ClientSi(obj) => client_sis.push(obj),
                Object::LocalDecision(obj) => match local_decisions.last_mut() {
                    Some((_, group)) => group.push(obj),
                    None => {
                        return Err(Error::BadMessageFormat(
                            "local decision without a preceding context",
                        ))
                    }
                },
                Object::Integrity(obj) => set(&mut integrity, obj, Self::OP_CODE, c_num)?,
                object => return Err(unexpected(&object, Self::OP_CODE)),
            }
        }

        if local_decisions.iter().any(|(_, group)| group.is_empty()) {
            return Err(Error::BadMessageFormat(
                "context without local decisions in request",
            ));
        }

        Ok(Self {
            handle: required(handle, Self::OP_CODE, "Handle")?,
            context: required(context, Self::OP_CODE, "Context")?,
            in_interface,
            out_interface,
            client_sis,
            local_decisions,
            integrity,
        })
    }

    fn write_objects(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        self.handle.write_object(cursor)?;
        self.context.write_object(cursor)?;
        write_opt(&self.in_interface, cursor)?;
        write_opt(&self.out_interface, cursor)?;
        for client_si in &self.client_sis {
            client_si.write_object(cursor)?;
        }
        for (context, decisions) in &self.local_decisions {
            context.write_object(cursor)?;
            for decision in decisions {
                decision.write_object(cursor)?;
            }
        }
        write_opt(&self.integrity, cursor)
    }
}

/// What a decision message carries. Exactly one of the two, never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionPayload {
    Error(ErrorObject),
    Decisions(Vec<(Context, Vec<Decision>)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionMessage {
    handle: Handle,
    payload: DecisionPayload,
    integrity: Option<Integrity>,
}

impl DecisionMessage {
    /// Builds a decision message from an error or from decision sets, but not both.
    ///
    /// Every decision set must be non-empty and hold exactly one flags decision.
    pub fn try_new(
        handle: Handle,
        error: Option<ErrorObject>,
        decisions: Vec<(Context, Vec<Decision>)>,
        integrity: Option<Integrity>,
    ) -> Result<Self, Error> {
        let payload = match (error, decisions.is_empty()) {
            (Some(_), false) => {
                return Err(Error::InvalidDecision(
                    "holds both an error and decisions",
                ))
            }
            (None, true) => return Err(Error::InvalidDecision("holds neither error nor decisions")),
            (Some(error), true) => DecisionPayload::Error(error),
            (None, false) => {
                for (_, set) in &decisions {
                    if set.is_empty() {
                        return Err(Error::InvalidDecision("empty decision set"));
                    }
                    if set.iter().filter(|decision| decision.is_flags()).count() != 1 {
                        return Err(Error::InvalidDecision(
                            "decision set needs exactly one flags decision",
                        ));
                    }
                }
                DecisionPayload::Decisions(decisions)
            }
        };

        Ok(Self {
            handle,
            payload,
            integrity,
        })
    }

    pub fn error(handle: Handle, error: ErrorObject) -> Self {
        Self {
            handle,
            payload: DecisionPayload::Error(error),
            integrity: None,
        }
    }

    /// A single decision set under `context`: the flags decision followed by `data`.
    pub fn single(
        handle: Handle,
        context: Context,
        command: Command,
        flags: DecisionFlags,
        data: Option<Decision>,
    ) -> Result<Self, Error> {
        let mut set = vec![Decision::flags(command, flags)];
        set.extend(data);
        Self::try_new(handle, None, vec![(context, set)], None)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn payload(&self) -> &DecisionPayload {
        &self.payload
    }

    pub fn integrity(&self) -> Option<&Integrity> {
        self.integrity.as_ref()
    }
}

impl MessageBody for DecisionMessage {
    const OP_CODE: OpCode = OpCode::Decision;

    fn from_objects(objects: Vec<Object>) -> Result<Self, Error> {
        let (mut handle, mut error, mut integrity) = (None, None, None);
        let mut decisions: Vec<(Context, Vec<Decision>)> = Vec::new();

        for object in objects {
            let c_num = object.c_num();
            match object {
                Object::Handle(obj) => set(&mut handle, obj, Self::OP_CODE, c_num)?,
                Object::Context(obj) => decisions.push((obj, Vec::new())),
                Object::Decision(obj) => match decisions.last_mut() {
                    Some((_, set)) => set.push(obj),
                    None => {
                        return Err(Error::BadMessageFormat(
                            "decision without a preceding context",
                        ))
                    }
                },
                Object::Error(obj) => set(&mut error, obj, Self::OP_CODE, c_num)?,
                Object::Integrity(obj) => set(&mut integrity, obj, Self::OP_CODE, c_num)?,
                object => return Err(unexpected(&object, Self::OP_CODE)),
            }
        }

        let handle = required(handle, Self::OP_CODE, "Handle")?;
        let payload = match (error, decisions.is_empty()) {
            (Some(_), false) => {
                return Err(Error::InvalidDecision(
                    "holds both an error and decisions",
                ))
            }
            (None, true) => return Err(Error::InvalidDecision("holds neither error nor decisions")),
            (Some(error), true) => DecisionPayload::Error(error),
            (None, false) => {
                if decisions.iter().any(|(_, set)| set.is_empty()) {
                    return Err(Error::InvalidDecision("empty decision set"));
                }
                DecisionPayload::Decisions(decisions)
            }
        };

        Ok(Self {
            handle,
            payload,
            integrity,
        })
    }

    fn write_objects(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        self.handle.write_object(cursor)?;
        match &self.payload {
            DecisionPayload::Error(error) => error.write_object(cursor)?,
            DecisionPayload::Decisions(decisions) => {
                for (context, set) in decisions {
                    context.write_object(cursor)?;
                    for decision in set.iter().filter(|decision| decision.is_flags()) {
                        decision.write_object(cursor)?;
                    }
                    for decision in set.iter().filter(|decision| !decision.is_flags()) {
                        decision.write_object(cursor)?;
                    }
                }
            }
        }
        write_opt(&self.integrity, cursor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub handle: Handle,
    pub report_type: ReportType,
    pub client_si: Option<ClientSi>,
    pub integrity: Option<Integrity>,
}

impl MessageBody for Report {
    const OP_CODE: OpCode = OpCode::Report;

    fn from_objects(objects: Vec<Object>) -> Result<Self, Error> {
        let (mut handle, mut report_type, mut client_si, mut integrity) = (None, None, None, None);
        for object in objects {
            let c_num = object.c_num();
            match object {
                Object::Handle(obj) => set(&mut handle, obj, Self::OP_CODE, c_num)?,
                Object::ReportType(obj) => set(&mut report_type, obj, Self::OP_CODE, c_num)?,
                Object::ClientSi(obj) => set(&mut client_si, obj, Self::OP_CODE, c_num)?,
                Object::Integrity(obj) => set(&mut integrity, obj, Self::OP_CODE, c_num)?,
                object => return Err(unexpected(&object, Self::OP_CODE)),
            }
        }

        Ok(Self {
            handle: required(handle, Self::OP_CODE, "Handle")?,
            report_type: required(report_type, Self::OP_CODE, "Report-Type")?,
            client_si,
            integrity,
        })
    }

    fn write_objects(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        self.handle.write_object(cursor)?;
        self.report_type.write_object(cursor)?;
        write_opt(&self.client_si, cursor)?;
        write_opt(&self.integrity, cursor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequestState {
    pub handle: Handle,
    pub reason: Reason,
    pub integrity: Option<Integrity>,
}

impl MessageBody for DeleteRequestState {
    const OP_CODE: OpCode = OpCode::DeleteRequestState;

    fn from_objects(objects: Vec<Object>) -> Result<Self, Error> {
        let (mut handle, mut reason, mut integrity) = (None, None, None);
        for object in objects {
            let c_num = object.c_num();
            match object {
                Object::Handle(obj) => set(&mut handle, obj, Self::OP_CODE, c_num)?,
                Object::Reason(obj) => set(&mut reason, obj, Self::OP_CODE, c_num)?,
                Object::Integrity(obj) => set(&mut integrity, obj, Self::OP_CODE, c_num)?,
                object => return Err(unexpected(&object, Self::OP_CODE)),
            }
        }

        Ok(Self {
            handle: required(handle, Self::OP_CODE, "Handle")?,
            reason: required(reason, Self::OP_CODE, "Reason")?,
            integrity,
        })
    }

    fn write_objects(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        self.handle.write_object(cursor)?;
        self.reason.write_object(cursor)?;
        write_opt(&self.integrity, cursor)
    }
}

macro_rules! impl_sync_message {
    ($name:ident, $op_code:ident) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            pub handle: Option<Handle>,
            pub integrity: Option<Integrity>,
        }

        impl MessageBody for $name {
            const OP_CODE: OpCode = OpCode::$op_code;

            fn from_objects(objects: Vec<Object>) -> Result<Self, Error> {
                let mut message = Self::default();
                for object in objects {
                    let c_num = object.c_num();
                    match object {
                        Object::Handle(obj) => set(&mut message.handle, obj, Self::OP_CODE, c_num)?,
                        Object::Integrity(obj) => {
                            set(&mut message.integrity, obj, Self::OP_CODE, c_num)?
                        }
                        object => return Err(unexpected(&object, Self::OP_CODE)),
                    }
                }
                Ok(message)
            }

            fn write_objects(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
                write_opt(&self.handle, cursor)?;
                write_opt(&self.integrity, cursor)
            }
        }
    };
}

impl_sync_message!(SyncStateRequest, SyncStateRequest);
impl_sync_message!(SyncStateComplete, SyncStateComplete);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepAlive {
    pub integrity: Option<Integrity>,
}

impl MessageBody for KeepAlive {
    const OP_CODE: OpCode = OpCode::KeepAlive;

    fn from_objects(objects: Vec<Object>) -> Result<Self, Error> {
        let mut integrity = None;
        for object in objects {
            let c_num = object.c_num();
            match object {
                Object::Integrity(obj) => set(&mut integrity, obj, Self::OP_CODE, c_num)?,
                object => return Err(unexpected(&object, Self::OP_CODE)),
            }
        }
        Ok(Self { integrity })
    }

    fn write_objects(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        write_opt(&self.integrity, cursor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopsMessage {
    ClientOpen(ClientOpen),
    ClientAccept(ClientAccept),
    ClientClose(ClientClose),
    Request(Request),
    Decision(DecisionMessage),
    Report(Report),
    DeleteRequestState(DeleteRequestState),
    SyncStateRequest(SyncStateRequest),
    SyncStateComplete(SyncStateComplete),
    KeepAlive(KeepAlive),
}

macro_rules! impl_from_message {
    ($variant:ident, $name:ident) => {
        impl From<$name> for CopsMessage {
            fn from(msg: $name) -> Self {
                Self::$variant(msg)
            }
        }
    };
}

impl_from_message!(ClientOpen, ClientOpen);
impl_from_message!(ClientAccept, ClientAccept);
impl_from_message!(ClientClose, ClientClose);
impl_from_message!(Request, Request);
impl_from_message!(Decision, DecisionMessage);
impl_from_message!(Report, Report);
impl_from_message!(DeleteRequestState, DeleteRequestState);
impl_from_message!(SyncStateRequest, SyncStateRequest);
impl_from_message!(SyncStateComplete, SyncStateComplete);
impl_from_message!(KeepAlive, KeepAlive);

impl CopsMessage {
    pub fn op_code(&self) -> OpCode {
        match self {
            Self::ClientOpen(_) => ClientOpen::OP_CODE,
            Self::ClientAccept(_) => ClientAccept::OP_CODE,
            Self::ClientClose(_) => ClientClose::OP_CODE,
            Self::Request(_) => Request::OP_CODE,
            Self::Decision(_) => DecisionMessage::OP_CODE,
            Self::Report(_) => Report::OP_CODE,
            Self::DeleteRequestState(_) => DeleteRequestState::OP_CODE,
            Self::SyncStateRequest(_) => SyncStateRequest::OP_CODE,
            Self::SyncStateComplete(_) => SyncStateComplete::OP_CODE,
            Self::KeepAlive(_) => KeepAlive::OP_CODE,
        }
    }

    fn from_objects(op_code: OpCode, objects: Vec<Object>) -> Result<Self, Error> {
        Ok(match op_code {
            OpCode::ClientOpen => ClientOpen::from_objects(objects)?.into(),
            OpCode::ClientAccept => ClientAccept::from_objects(objects)?.into(),
            OpCode::ClientClose => ClientClose::from_objects(objects)?.into(),
            OpCode::Request => Request::from_objects(objects)?.into(),
            OpCode::Decision => DecisionMessage::from_objects(objects)?.into(),
            OpCode::Report => Report::from_objects(objects)?.into(),
            OpCode::DeleteRequestState => DeleteRequestState::from_objects(objects)?.into(),
            OpCode::SyncStateRequest => SyncStateRequest::from_objects(objects)?.into(),
            OpCode::SyncStateComplete => SyncStateComplete::from_objects(objects)?.into(),
            OpCode::KeepAlive => KeepAlive::from_objects(objects)?.into(),
            OpCode::Na => return Err(Error::BadMessageFormat("unknown op code")),
        })
    }

    fn write_objects(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        match self {
            Self::ClientOpen(msg) => msg.write_objects(cursor),
            Self::ClientAccept(msg) => msg.write_objects(cursor),
            Self::ClientClose(msg) => msg.write_objects(cursor),
            Self::Request(msg) => msg.write_objects(cursor),
            Self::Decision(msg) => msg.write_objects(cursor),
            Self::Report(msg) => msg.write_objects(cursor),
            Self::DeleteRequestState(msg) => msg.write_objects(cursor),
            Self::SyncStateRequest(msg) => msg.write_objects(cursor),
            Self::SyncStateComplete(msg) => msg.write_objects(cursor),
            Self::KeepAlive(msg) => msg.write_objects(cursor),
        }
    }
}

/// A complete message: common header and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: MessageHeader,
    pub message: CopsMessage,
}

impl Packet {
    pub fn new(client_type: u16, message: impl Into<CopsMessage>) -> Self {
        let message = message.into();
        Self {
            header: MessageHeader::new(message.op_code(), client_type),
            message,
        }
    }

    pub fn solicited(mut self) -> Self {
        self.header = self.header.solicited();
        self
    }

    /// Decodes one message occupying exactly `bytes`.
    pub fn read(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = Cursor::new(bytes);
        let (header, total_len) = MessageHeader::read(&mut cursor)?;
        let total_len = usize::try_from(total_len)?;
        if total_len > bytes.len() {
            return Err(Error::DataOutOfBounds {
                offset: 0,
                len: total_len,
                available: bytes.len(),
            });
        }
        if total_len < bytes.len() {
            return Err(Error::TrailingBytes {
                name: header.op_code.name(),
                remaining: bytes.len() - total_len,
            });
        }

        let mut body = &bytes[COMMON_HEADER_LEN ..];
        let mut objects = Vec::new();
        let mut after_integrity = false;
        while !body.is_empty() {
            let decoded = decode_object(body)?;
            if after_integrity {
                return Err(Error::BadMessageFormat(
                    "integrity object is not the last object",
                ));
            }
            after_integrity = matches!(decoded.object, Object::Integrity(_));
            objects.push(decoded.object);
            body = &body[decoded.consumed ..];
        }

        Ok(Self {
            header,
            message: CopsMessage::from_objects(header.op_code, objects)?,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut body = Cursor::new(Vec::new());
        self.message.write_objects(&mut body)?;
        let body = body.into_inner();

        let total_len = u32::try_from(COMMON_HEADER_LEN + body.len())?;
        check_total_len(total_len)?;
        let mut cursor = Cursor::new(Vec::with_capacity(COMMON_HEADER_LEN + body.len()));
        let mut header = self.header;
        header.op_code = self.message.op_code();
        header.write(&mut cursor, total_len)?;
        cursor.write_all(&body)?;
        Ok(cursor.into_inner())
    }
}

impl Error {
    /// The COPS error a peer is told about when one of its messages fails to decode.
    pub fn to_error_object(&self) -> ErrorObject {
        match self {
            Self::MandatoryObjectMissing { .. } => {
                ErrorObject::new(ErrorCode::MandatoryObjectMissing, 0)
            }
            Self::UnknownObject { c_num, c_type } | Self::IllegalCType { c_num, c_type } => {
                ErrorObject::new(
                    ErrorCode::UnknownObject,
                    (u16::from(*c_num) << 8) | u16::from(*c_type),
                )
            }
            _ => ErrorObject::new(ErrorCode::BadMsgFormat, 0),
        }
    }
}
