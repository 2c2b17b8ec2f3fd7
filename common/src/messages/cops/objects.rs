use super::header::{CNum, CType, ObjectHeader};
use crate::{
    constants::OBJECT_HEADER_LEN,
    messages::{
        impl_bitflags_message_component,
        padded_len,
        remaining,
        write_padding,
        Data,
        Error,
        MessageComponent,
        Reserved,
    },
};
use bitflags::bitflags;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use parser::MessageComponent;
use std::{
    io::{self, Cursor, Write},
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

/// A typed COPS object: its C-Num is fixed per type and its C-Type may depend on the value.
pub trait CopsObject: Sized {
    const C_NUM: CNum;

    fn c_type(&self) -> CType;

    fn read_body(c_type: CType, cursor: &mut Cursor<&[u8]>) -> Result<Self, Error>;

    fn write_body(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error>;

    /// Writes header, body and zero padding.
    fn write_object(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        let mut body = Cursor::new(Vec::new());
        self.write_body(&mut body)?;
        let body = body.into_inner();

        let length = u16::try_from(OBJECT_HEADER_LEN + body.len())
            .map_err(|_| Error::BodyTooLong(body.len()))?;
        ObjectHeader {
            length,
            c_num: Self::C_NUM,
            c_type: self.c_type(),
        }
        .write(cursor)?;
        cursor.write_all(&body)?;
        write_padding(cursor, body.len())
    }

    fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_object(&mut cursor)?;
        Ok(cursor.into_inner())
    }
}

/// Objects whose body has a single layout, carried under the default C-Type.
macro_rules! impl_def_object {
    ($name:ident, $c_num:ident) => {
        impl CopsObject for $name {
            const C_NUM: CNum = CNum::$c_num;

            fn c_type(&self) -> CType {
                CType::Def
            }

            fn read_body(_: CType, cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
                <Self as MessageComponent>::read(cursor)
            }

            fn write_body(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
                MessageComponent::write(self, cursor)
            }
        }
    };
}

/// Opaque byte-string objects.
macro_rules! impl_data_object {
    ($name:ident, $c_num:ident) => {
        impl CopsObject for $name {
            const C_NUM: CNum = CNum::$c_num;

            fn c_type(&self) -> CType {
                CType::Def
            }

            fn read_body(_: CType, cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
                Data::read(cursor).map(Self)
            }

            fn write_body(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
                self.0.write(cursor)
            }
        }
    };
}

/// Client handle chosen by the PEP to correlate one request state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub Data);
impl_data_object!(Handle, Handle);

impl Handle {
    pub fn new(id: impl Into<Data>) -> Self {
        Self(id.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PepId(pub Data);
impl_data_object!(PepId, PepId);

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RType {
    #[parse(fallback)]
    Na = 0,
    IncomingAdmission = 1,
    ResourceAllocation = 2,
    OutgoingAdmission = 4,
    Configuration = 8,
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Context {
    pub r_type: RType,
    pub m_type: u16,
}
impl_def_object!(Context, Context);

impl Context {
    pub fn new(r_type: RType, m_type: u16) -> Self {
        Self { r_type, m_type }
    }
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    Null = 0,
    Install = 1,
    Remove = 2,
}

bitflags! {
    pub struct DecisionFlags: u16 {
        /// Trigger error: report the outcome of applying the decision.
        const REQERROR = 0x01;
        /// The PDP wants the request state itself installed or removed.
        const REQSTATE = 0x02;
    }
}

impl_bitflags_message_component!(DecisionFlags, u16);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Flags {
        command: Command,
        flags: DecisionFlags,
    },
    Stateless(Data),
    Replacement(Data),
    ClientSi(Data),
    Named(Data),
}

impl Decision {
    pub fn flags(command: Command, flags: DecisionFlags) -> Self {
        Self::Flags { command, flags }
    }

    pub fn is_flags(&self) -> bool {
        matches!(self, Self::Flags { .. })
    }
}

impl CopsObject for Decision {
    const C_NUM: CNum = CNum::Decision;

    fn c_type(&self) -> CType {
        match self {
            Self::Flags { .. } => CType::Def,
            Self::Stateless(_) => CType::Stateless,
            Self::Replacement(_) => CType::Repl,
            Self::ClientSi(_) => CType::Csi,
            Self::Named(_) => CType::Named,
        }
    }

    fn read_body(c_type: CType, cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Ok(match c_type {
            CType::Def => Self::Flags {
                command: Command::read(cursor)?,
                flags: DecisionFlags::read(cursor)?,
            },
            CType::Stateless => Self::Stateless(Data::read(cursor)?),
            CType::Repl => Self::Replacement(Data::read(cursor)?),
            CType::Csi => Self::ClientSi(Data::read(cursor)?),
            CType::Named => Self::Named(Data::read(cursor)?),
            CType::Na => return Err(Error::BadMessageFormat("decision without a C-Type")),
        })
    }

    fn write_body(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        match self {
            Self::Flags { command, flags } => {
                command.write(cursor)?;
                flags.write(cursor)
            }
            Self::Stateless(data)
            | Self::Replacement(data)
            | Self::ClientSi(data)
            | Self::Named(data) => data.write(cursor),
        }
    }
}

/// A decision taken by the PEP's local decision point, carried in requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDecision(pub Decision);

impl CopsObject for LocalDecision {
    const C_NUM: CNum = CNum::LocalDecision;

    fn c_type(&self) -> CType {
        self.0.c_type()
    }

    fn read_body(c_type: CType, cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        <Decision as CopsObject>::read_body(c_type, cursor).map(Self)
    }

    fn write_body(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        self.0.write_body(cursor)
    }
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    #[parse(fallback)]
    Na = 0,
    BadHandle = 1,
    BadHandleRef = 2,
    BadMsgFormat = 3,
    FailProcess = 4,
    MissingInfo = 5,
    UnsupportedClientType = 6,
    MandatoryObjectMissing = 7,
    ClientFailure = 8,
    CommFailure = 9,
    Unknown = 10,
    ShuttingDown = 11,
    PdpRedirect = 12,
    UnknownObject = 13,
    AuthFailure = 14,
    AuthRequired = 15,
}

impl ErrorCode {
    pub fn description(self) -> &'static str {
        match self {
            Self::Na => "N/A",
            Self::BadHandle => "Bad handle",
            Self::BadHandleRef => "Invalid handle reference",
            Self::BadMsgFormat => "Bad message format (Malformed Message)",
            Self::FailProcess => "Unable to process (server gives up on query)",
            Self::MissingInfo => "Mandatory client-specific info missing",
            Self::UnsupportedClientType => "Unsupported client",
            Self::MandatoryObjectMissing => "Mandatory COPS object missing",
            Self::ClientFailure => "Client failure",
            Self::CommFailure => "Communication failure",
            Self::Unknown => "Unspecified",
            Self::ShuttingDown => "Shutting down",
            Self::PdpRedirect => "Redirect to Preferred Server",
            Self::UnknownObject => "Unknown COPS object",
            Self::AuthFailure => "Authentication failure",
            Self::AuthRequired => "Authentication required",
        }
    }
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorObject {
    pub code: ErrorCode,
    pub subcode: u16,
}
impl_def_object!(ErrorObject, Error);

impl ErrorObject {
    pub fn new(code: ErrorCode, subcode: u16) -> Self {
        Self { code, subcode }
    }

    pub fn description(&self) -> &'static str {
        self.code.description()
    }
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ReasonCode {
    #[parse(fallback)]
    Na = 0,
    Unspecified = 1,
    Management = 2,
    Preempted = 3,
    Tear = 4,
    Timeout = 5,
    RouteChange = 6,
    InsufficientResources = 7,
    PdpDirective = 8,
    UnsupportedDecision = 9,
    SyncHandleUnknown = 10,
    TransientHandle = 11,
    MalformedDecision = 12,
    UnknownCopsObject = 13,
}

impl ReasonCode {
    pub fn description(self) -> &'static str {
        match self {
            Self::Na => "N/A",
            Self::Unspecified => "Unspecified",
            Self::Management => "Management",
            Self::Preempted => "Preempted (Another request state takes precedence)",
            Self::Tear => "Tear (Used to communicate a signaled state removal)",
            Self::Timeout => "Timeout (Local state has timed-out)",
            Self::RouteChange => "Route Change (Change invalidates request state)",
            Self::InsufficientResources => "Insufficient Resources (No local resource available)",
            Self::PdpDirective => "PDP's Directive (PDP decision caused the delete)",
            Self::UnsupportedDecision => "Unsupported decision (PDP decision not supported)",
            Self::SyncHandleUnknown => "Synchronize Handle Unknown",
            Self::TransientHandle => "Transient Handle (stateless event)",
            Self::MalformedDecision => "Malformed Decision (could not recover)",
            Self::UnknownCopsObject => "Unknown COPS Object from PDP",
        }
    }
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reason {
    pub code: ReasonCode,
    pub subcode: u16,
}
impl_def_object!(Reason, Reason);

impl Reason {
    pub fn new(code: ReasonCode, subcode: u16) -> Self {
        Self { code, subcode }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientSiKind {
    Signaled,
    Named,
}

/// Client specific information. Opaque to the codec; PCMM carries its gate objects here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSi {
    pub kind: ClientSiKind,
    pub data: Data,
}

impl ClientSi {
    pub fn signaled(data: impl Into<Data>) -> Self {
        Self {
            kind: ClientSiKind::Signaled,
            data: data.into(),
        }
    }

    pub fn named(data: impl Into<Data>) -> Self {
        Self {
            kind: ClientSiKind::Named,
            data: data.into(),
        }
    }
}

impl CopsObject for ClientSi {
    const C_NUM: CNum = CNum::ClientSi;

    fn c_type(&self) -> CType {
        match self.kind {
            ClientSiKind::Signaled => CType::SIGNALED,
            ClientSiKind::Named => CType::NAMED_SI,
        }
    }

    fn read_body(c_type: CType, cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let kind = if c_type == CType::NAMED_SI {
            ClientSiKind::Named
        } else {
            ClientSiKind::Signaled
        };
        Ok(Self {
            kind,
            data: Data::read(cursor)?,
        })
    }

    fn write_body(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        self.data.write(cursor)
    }
}

#[derive(MessageComponent, Debug, Clone, PartialEq, Eq)]
pub struct Integrity {
    pub key_id: u32,
    pub seq_num: u32,
    #[parse(greedy)]
    pub digest: Vec<u8>,
}
impl_def_object!(Integrity, Integrity);

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq)]
pub struct KaTimer {
    pub reserved: Reserved<2>,
    pub seconds: u16,
}
impl_def_object!(KaTimer, KaTimer);

impl KaTimer {
    pub fn new(seconds: u16) -> Self {
        Self {
            reserved: Reserved,
            seconds,
        }
    }
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcctTimer {
    pub reserved: Reserved<2>,
    pub seconds: u16,
}
impl_def_object!(AcctTimer, AcctTimer);

impl AcctTimer {
    pub fn new(seconds: u16) -> Self {
        Self {
            reserved: Reserved,
            seconds,
        }
    }
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ReportType {
    Success = 1,
    Failure = 2,
    Accounting = 3,
}

impl CopsObject for ReportType {
    const C_NUM: CNum = CNum::ReportType;

    fn c_type(&self) -> CType {
        CType::Def
    }

    fn read_body(_: CType, cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let report_type = <Self as MessageComponent>::read(cursor)?;
        Reserved::<2>::read(cursor)?;
        Ok(report_type)
    }

    fn write_body(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        MessageComponent::write(self, cursor)?;
        Reserved::<2>.write(cursor)
    }
}

fn read_address(c_type: CType, cursor: &mut Cursor<&[u8]>) -> Result<IpAddr, Error> {
    if c_type == CType::IPV6 {
        Ipv6Addr::read(cursor).map(IpAddr::V6)
    } else {
        Ipv4Addr::read(cursor).map(IpAddr::V4)
    }
}

fn write_address(address: &IpAddr, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
    match address {
        IpAddr::V4(v4) => v4.write(cursor),
        IpAddr::V6(v6) => v6.write(cursor),
    }
}

fn address_c_type(address: &IpAddr) -> CType {
    match address {
        IpAddr::V4(_) => CType::IPV4,
        IpAddr::V6(_) => CType::IPV6,
    }
}

/// Address and interface index of a network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interface {
    pub address: IpAddr,
    pub if_index: u32,
}

impl Interface {
    fn read_body(c_type: CType, cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Ok(Self {
            address: read_address(c_type, cursor)?,
            if_index: cursor.read_u32::<BigEndian>()?,
        })
    }

    fn write_body(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        write_address(&self.address, cursor)?;
        cursor.write_u32::<BigEndian>(self.if_index)?;
        Ok(())
    }
}

/// Address and TCP port of a PDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdpAddress {
    pub address: IpAddr,
    pub port: u16,
}

impl PdpAddress {
    fn read_body(c_type: CType, cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let address = read_address(c_type, cursor)?;
        Reserved::<2>::read(cursor)?;
        Ok(Self {
            address,
            port: cursor.read_u16::<BigEndian>()?,
        })
    }

    fn write_body(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        write_address(&self.address, cursor)?;
        Reserved::<2>.write(cursor)?;
        cursor.write_u16::<BigEndian>(self.port)?;
        Ok(())
    }
}

macro_rules! impl_address_object {
    ($name:ident, $inner:ident) => {
        impl CopsObject for $name {
            const C_NUM: CNum = CNum::$name;

            fn c_type(&self) -> CType {
                address_c_type(&self.0.address)
            }

            fn read_body(c_type: CType, cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
                $inner::read_body(c_type, cursor).map(Self)
            }

            fn write_body(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
                self.0.write_body(cursor)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InInterface(pub Interface);
impl_address_object!(InInterface, Interface);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutInterface(pub Interface);
impl_address_object!(OutInterface, Interface);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdpRedirect(pub PdpAddress);
impl_address_object!(PdpRedirect, PdpAddress);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastPdpAddress(pub PdpAddress);
impl_address_object!(LastPdpAddress, PdpAddress);

/// Any object, keyed by C-Num.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Handle(Handle),
    Context(Context),
    InInterface(InInterface),
    OutInterface(OutInterface),
    Reason(Reason),
    Decision(Decision),
    LocalDecision(LocalDecision),
    Error(ErrorObject),
    ClientSi(ClientSi),
    KaTimer(KaTimer),
    PepId(PepId),
    ReportType(ReportType),
    PdpRedirect(PdpRedirect),
    LastPdpAddress(LastPdpAddress),
    AcctTimer(AcctTimer),
    Integrity(Integrity),
    /// A C-Num this codec does not know. Kept raw so it can be reported.
    Unknown { c_num: u8, c_type: u8, body: Data },
}

impl Object {
    pub fn c_num(&self) -> u8 {
        match self {
            Self::Handle(_) => CNum::Handle as u8,
            Self::Context(_) => CNum::Context as u8,
            Self::InInterface(_) => CNum::InInterface as u8,
            Self::OutInterface(_) => CNum::OutInterface as u8,
            Self::Reason(_) => CNum::Reason as u8,
            Self::Decision(_) => CNum::Decision as u8,
            Self::LocalDecision(_) => CNum::LocalDecision as u8,
            Self::Error(_) => CNum::Error as u8,
            Self::ClientSi(_) => CNum::ClientSi as u8,
            Self::KaTimer(_) => CNum::KaTimer as u8,
            Self::PepId(_) => CNum::PepId as u8,
            Self::ReportType(_) => CNum::ReportType as u8,
            Self::PdpRedirect(_) => CNum::PdpRedirect as u8,
            Self::LastPdpAddress(_) => CNum::LastPdpAddress as u8,
            Self::AcctTimer(_) => CNum::AcctTimer as u8,
            Self::Integrity(_) => CNum::Integrity as u8,
            Self::Unknown { c_num, .. } => *c_num,
        }
    }

    pub fn write_object(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        match self {
            Self::Handle(obj) => obj.write_object(cursor),
            Self::Context(obj) => obj.write_object(cursor),
            Self::InInterface(obj) => obj.write_object(cursor),
            Self::OutInterface(obj) => obj.write_object(cursor),
            Self::Reason(obj) => obj.write_object(cursor),
            Self::Decision(obj) => obj.write_object(cursor),
            Self::LocalDecision(obj) => obj.write_object(cursor),
            Self::Error(obj) => obj.write_object(cursor),
            Self::ClientSi(obj) => obj.write_object(cursor),
            Self::KaTimer(obj) => obj.write_object(cursor),
            Self::PepId(obj) => obj.write_object(cursor),
            Self::ReportType(obj) => obj.write_object(cursor),
            Self::PdpRedirect(obj) => obj.write_object(cursor),
            Self::LastPdpAddress(obj) => obj.write_object(cursor),
            Self::AcctTimer(obj) => obj.write_object(cursor),
            Self::Integrity(obj) => obj.write_object(cursor),
            Self::Unknown {
                c_num,
                c_type,
                body,
            } => {
                let length = u16::try_from(OBJECT_HEADER_LEN + body.len())
                    .map_err(|_| Error::BodyTooLong(body.len()))?;
                cursor.write_u16::<BigEndian>(length)?;
                cursor.write_u8(*c_num)?;
                cursor.write_u8(*c_type)?;
                body.write(cursor)?;
                write_padding(cursor, body.len())
            }
        }
    }
}

/// One object cut out of a message body.
#[derive(Debug)]
pub struct DecodedObject {
    pub header: ObjectHeader,
    pub object: Object,
    /// Bytes consumed including padding.
    pub consumed: usize,
}

/// Decodes the object at the start of `bytes`.
///
/// The declared length must fit in `bytes` together with its padding. Padding content is not
/// checked.
pub fn decode_object(bytes: &[u8]) -> Result<DecodedObject, Error> {
    let mut cursor = Cursor::new(bytes);
    let header = ObjectHeader::read(&mut cursor)?;
    let (raw_c_num, raw_c_type) = (bytes[2], bytes[3]);

    let bad_length = Error::BadObjectLength {
        c_num: raw_c_num,
        length: header.length,
    };
    let body_len = match header.body_len() {
        Some(len) => len,
        None => return Err(bad_length),
    };
    let consumed = padded_len(usize::from(header.length));
    if consumed > bytes.len() {
        return Err(bad_length);
    }

    let body = &bytes[OBJECT_HEADER_LEN .. OBJECT_HEADER_LEN + body_len];
    if header.c_num == CNum::Na {
        return Ok(DecodedObject {
            header,
            object: Object::Unknown {
                c_num: raw_c_num,
                c_type: raw_c_type,
                body: Data::from(body),
            },
            consumed,
        });
    }
    if !header.c_num.allows(header.c_type) {
        return Err(Error::IllegalCType {
            c_num: raw_c_num,
            c_type: raw_c_type,
        });
    }

    let object = decode_body(&header, body).map_err(|e| match e {
        Error::StdIo(e) if e.kind() == io::ErrorKind::UnexpectedEof => Error::BadObjectLength {
            c_num: raw_c_num,
            length: header.length,
        },
        e => e,
    })?;

    Ok(DecodedObject {
        header,
        object,
        consumed,
    })
}

fn decode_body(header: &ObjectHeader, body: &[u8]) -> Result<Object, Error> {
    fn read<T: CopsObject>(c_type: CType, body: &[u8]) -> Result<T, Error> {
        let mut cursor = Cursor::new(body);
        let object = T::read_body(c_type, &mut cursor)?;
        match remaining(&cursor) {
            0 => Ok(object),
            remaining => Err(Error::TrailingBytes {
                name: T::C_NUM.name(),
                remaining,
            }),
        }
    }

    let c_type = header.c_type;
    Ok(match header.c_num {
        CNum::Handle => Object::Handle(read(c_type, body)?),
        CNum::Context => Object::Context(read(c_type, body)?),
        CNum::InInterface => Object::InInterface(read(c_type, body)?),
        CNum::OutInterface => Object::OutInterface(read(c_type, body)?),
        CNum::Reason => Object::Reason(read(c_type, body)?),
        CNum::Decision => Object::Decision(read(c_type, body)?),
        CNum::LocalDecision => Object::LocalDecision(read(c_type, body)?),
        CNum::Error => Object::Error(read(c_type, body)?),
        CNum::ClientSi => Object::ClientSi(read(c_type, body)?),
        CNum::KaTimer => Object::KaTimer(read(c_type, body)?),
        CNum::PepId => Object::PepId(read(c_type, body)?),
        CNum::ReportType => Object::ReportType(read(c_type, body)?),
        CNum::PdpRedirect => Object::PdpRedirect(read(c_type, body)?),
        CNum::LastPdpAddress => Object::LastPdpAddress(read(c_type, body)?),
        CNum::AcctTimer => Object::AcctTimer(read(c_type, body)?),
        CNum::Integrity => Object::Integrity(read(c_type, body)?),
        CNum::Na => Object::Unknown {
            c_num: 0,
            c_type: c_type as u8,
            body: Data::from(body),
        },
    })
}
