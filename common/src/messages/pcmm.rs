//! PacketCable Multimedia gate control objects, carried opaquely inside a COPS ClientSI.
//!
//! Each object has the same 4 byte header as a COPS object, except that its length counts the
//! padding as well.

use super::{padded_len, write_padding, Data, Error, MessageComponent};
use crate::constants::{OBJECT_HEADER_LEN, PCMM_MAJOR_VERSION, PCMM_MINOR_VERSION};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::warn;
use parser::MessageComponent;
use std::{
    io::{Cursor, Write},
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SNum {
    #[parse(fallback)]
    Na = 0,
    TransactionId = 1,
    Amid = 2,
    SubscriberId = 3,
    GateId = 4,
    GateSpec = 5,
    Classifiers = 6,
    TrafficProfile = 7,
    EventGenInfo = 8,
    VolumeBasedUsageLimit = 9,
    TimeBasedUsageLimit = 10,
    OpaqueData = 11,
    GateTimeInfo = 12,
    GateUsageInfo = 13,
    PcmmError = 14,
    GateState = 15,
    VersionInfo = 16,
    Psid = 17,
    SyncOptions = 18,
    MsgReceiptKey = 19,
    UserId = 20,
    SharedResourceId = 21,
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmmObjectHeader {
    pub length: u16,
    pub s_num: SNum,
    pub s_type: u8,
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum GateCommand {
    #[parse(fallback)]
    Unknown = 0,
    Set = 4,
    SetAck = 5,
    SetErr = 6,
    Info = 7,
    InfoAck = 8,
    InfoErr = 9,
    Delete = 10,
    DeleteAck = 11,
    DeleteErr = 12,
    RptState = 15,
    CmdErr = 16,
    PdpConfig = 17,
    PdpConfigAck = 18,
    PdpConfigErr = 19,
    SyncRequest = 20,
    SyncReport = 21,
    SyncComplete = 22,
    MsgReceipt = 23,
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionId {
    pub trans_id: u16,
    pub gate_command: GateCommand,
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Amid {
    pub app_type: u16,
    pub app_mgr_tag: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub IpAddr);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GateId(pub u32);

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    Downstream = 0,
    Upstream = 1,
    #[parse(fallback)]
    Unknown = 0xff,
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSpec {
    pub direction: Direction,
    pub tos_overwrite: u8,
    pub tos_mask: u8,
    pub session_class: u8,
    pub t1: u16,
    pub t2: u16,
    pub t3: u16,
    pub t4: u16,
}

impl GateSpec {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            tos_overwrite: 0,
            tos_mask: 0xff,
            session_class: 0,
            t1: 300,
            t2: 0,
            t3: 0,
            t4: 0,
        }
    }
}

/// A classifier, kept in its wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    pub s_type: u8,
    pub data: Data,
}

pub const SCN_S_TYPE: u8 = 2;
pub const SCN_MIN_LEN: usize = 2;
pub const SCN_MAX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrafficProfile {
    /// A DOCSIS service class name profile.
    ServiceClassName { envelope: u8, name: String },
    Other { s_type: u8, data: Data },
}

impl TrafficProfile {
    pub fn service_class_name(envelope: u8, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if !(SCN_MIN_LEN ..= SCN_MAX_LEN).contains(&name.len()) {
            return Err(Error::BadMessageFormat(
                "service class name must be 2 to 16 characters",
            ));
        }
        Ok(Self::ServiceClassName { envelope, name })
    }

    fn s_type(&self) -> u8 {
        match self {
            Self::ServiceClassName { .. } => SCN_S_TYPE,
            Self::Other { s_type, .. } => *s_type,
        }
    }

    fn read_body(s_type: u8, body: &[u8]) -> Result<Self, Error> {
        if s_type != SCN_S_TYPE {
            return Ok(Self::Other {
                s_type,
                data: Data::from(body),
            });
        }

        if body.len() < 4 {
            return Err(Error::BadMessageFormat("service class name profile too short"));
        }
        // The name runs until the first NUL of its padding
        let name = &body[4 ..];
        let end = name.iter().position(|&byte| byte == 0).unwrap_or(name.len());
        Ok(Self::ServiceClassName {
            envelope: body[0],
            name: String::from_utf8(name[.. end].to_vec())?,
        })
    }

    fn write_body(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        match self {
            Self::ServiceClassName { envelope, name } => {
                cursor.write_all(&[*envelope, 0, 0, 0])?;
                cursor.write_all(name.as_bytes())?;
            }
            Self::Other { data, .. } => data.write(cursor)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateTimeInfo(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateUsageInfo(pub u64);

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PcmmErrorCode {
    #[parse(fallback)]
    Na = 0,
    InsufficientResources = 1,
    UnknownGateId = 2,
    MissingRequiredObject = 6,
    InvalidObject = 7,
    VolumeUsageLimit = 8,
    TimeUsageLimit = 9,
    SessionClassLimit = 10,
    UndefinedServiceClassName = 11,
    IncompatibleEnvelope = 12,
    InvalidSubscriberId = 13,
    UnauthorizedAmid = 14,
    NumberOfClassifiers = 15,
    PolicyException = 16,
    InvalidField = 17,
    TransportError = 18,
    UnknownGateCommand = 19,
    Docsis1Cm = 20,
    NumberOfCmSids = 21,
    NumberOfCmtsSids = 22,
    UnauthorizedPsid = 23,
    NoStateForPdp = 24,
    UnsupportedSyncType = 25,
    StateIncomplete = 26,
    UpstreamDropUnsupported = 27,
    MulticastGateError = 28,
    MulticastVolumeLimit = 29,
    MulticastUncommitted = 30,
    MulticastGateModification = 31,
    MulticastUpstream = 32,
    MulticastGateSpecIncompatible = 33,
    MulticastQos = 34,
    MulticastDownstreamResequencing = 35,
    OtherUnspecified = 127,
}

impl PcmmErrorCode {
    pub fn description(self) -> &'static str {
        match self {
            Self::Na => "NA",
            Self::InsufficientResources => "Insufficient Resources",
            Self::UnknownGateId => "Unknown GateID",
            Self::MissingRequiredObject => "Missing Required Object",
            Self::InvalidObject => "Invalid Object",
            Self::VolumeUsageLimit => "Volume Based Usage Limit Exceeded",
            Self::TimeUsageLimit => "Time Based Usage Limit Exceeded",
            Self::SessionClassLimit => "Session Class Limit Exceeded",
            Self::UndefinedServiceClassName => "Undefined Service Class Name",
            Self::IncompatibleEnvelope => "Incompatible Envelope",
            Self::InvalidSubscriberId => "Invalid SubscriberID",
            Self::UnauthorizedAmid => "Unauthorized AMID",
            Self::NumberOfClassifiers => "Number of Classifiers Not Supported",
            Self::PolicyException => "Policy Exception",
            Self::InvalidField => "Invalid Field Value in Object",
            Self::TransportError => "Transport Error",
            Self::UnknownGateCommand => "Unknown Gate Command",
            Self::Docsis1Cm => "DOCSIS 1.0 CM",
            Self::NumberOfCmSids => "Number of SIDs exceeded in CM",
            Self::NumberOfCmtsSids => "Number of SIDs exceeded in CMTS",
            Self::UnauthorizedPsid => "Unauthorized PSID",
            Self::NoStateForPdp => "No State for PDP",
            Self::UnsupportedSyncType => "Unsupported Synch Type",
            Self::StateIncomplete => "State Data Incomplete",
            Self::UpstreamDropUnsupported => "Upstream Drop Unsupported",
            Self::MulticastGateError => "Multicast Gate Error",
            Self::MulticastVolumeLimit => "Multicast Volume Limit Unsupported",
            Self::MulticastUncommitted => "Uncommitted Multicast Not Supported",
            Self::MulticastGateModification => "Multicast Gate Modification Not Supported",
            Self::MulticastUpstream => "Upstream Multicast Not Supported",
            Self::MulticastGateSpecIncompatible => "Multicast GateSpec incompatibility",
            Self::MulticastQos => "Multicast QoS Error",
            Self::MulticastDownstreamResequencing => "Multicast Downstream Resequencing mismatch",
            Self::OtherUnspecified => "Other, Unspecified Error",
        }
    }
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmmError {
    pub code: PcmmErrorCode,
    pub subcode: u16,
}

impl PcmmError {
    pub fn new(code: PcmmErrorCode, subcode: u16) -> Self {
        Self { code, subcode }
    }

    /// Error for a missing object: the subcode names the object by S-Num and S-Type.
    pub fn missing(s_num: SNum, s_type: u8) -> Self {
        Self::new(
            PcmmErrorCode::MissingRequiredObject,
            ((s_num as u16) << 8) | u16::from(s_type),
        )
    }
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum GateStateKind {
    #[parse(fallback)]
    Na = 0,
    IdleClosed = 1,
    Authorized = 2,
    Reserved = 3,
    Committed = 4,
    CommittedRecovery = 5,
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum GateStateReason {
    Zero = 0,
    ReservationReassignment = 1,
    LackOfMacLayerResponses = 2,
    T1Expiration = 3,
    T2Expiration = 4,
    T3Expiration = 5,
    LackOfReservationMaintenance = 6,
    UnchangedVolumeLimitReached = 7,
    T4Expiration = 8,
    UnchangedT2ReservationReduction = 9,
    UnchangedTimeLimitReached = 10,
    VolumeLimitReached = 11,
    TimeLimitReached = 12,
    CmtsOther = 13,
    UnchangedSharedResourceIdChanged = 14,
    LossOfSharedResource = 15,
    #[parse(fallback)]
    Other = 65535,
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateState {
    pub state: GateStateKind,
    pub reason: GateStateReason,
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub major: u16,
    pub minor: u16,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            major: PCMM_MAJOR_VERSION,
            minor: PCMM_MINOR_VERSION,
        }
    }
}

impl VersionInfo {
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut cursor = Cursor::new(Vec::new());
        write_tlv(&mut cursor, SNum::VersionInfo, 1, |body| self.write(body))?;
        Ok(cursor.into_inner())
    }
}

/// A gate control message: a flat list of PCMM objects, each optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateRequest {
    pub transaction_id: Option<TransactionId>,
    pub amid: Option<Amid>,
    pub subscriber_id: Option<SubscriberId>,
    pub gate_id: Option<GateId>,
    pub gate_spec: Option<GateSpec>,
    pub classifiers: Vec<Classifier>,
    pub traffic_profile: Option<TrafficProfile>,
    pub gate_time_info: Option<GateTimeInfo>,
    pub gate_usage_info: Option<GateUsageInfo>,
    pub gate_state: Option<GateState>,
    pub version_info: Option<VersionInfo>,
    pub error: Option<PcmmError>,
}

impl GateRequest {
    pub fn command(&self) -> Option<GateCommand> {
        self.transaction_id.map(|id| id.gate_command)
    }

    /// Parses the objects in `bytes`. Objects this codec does not know are skipped.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let mut gate = Self::default();
        let mut rest = bytes;

        while rest.len() >= OBJECT_HEADER_LEN {
            let header = PcmmObjectHeader::read(&mut Cursor::new(rest))?;
            let length = usize::from(header.length);
            if length < OBJECT_HEADER_LEN || length > rest.len() {
                return Err(Error::BadObjectLength {
                    c_num: rest[2],
                    length: header.length,
                });
            }

            let body = &rest[OBJECT_HEADER_LEN .. length];
            gate.read_object(&header, rest[2], body)?;
            rest = &rest[length ..];
        }

        Ok(gate)
    }

    fn read_object(
        &mut self,
        header: &PcmmObjectHeader,
        raw_s_num: u8,
        body: &[u8],
    ) -> Result<(), Error> {
        let mut cursor = Cursor::new(body);
        match header.s_num {
            SNum::TransactionId => self.transaction_id = Some(TransactionId::read(&mut cursor)?),
            SNum::Amid => self.amid = Some(Amid::read(&mut cursor)?),
            SNum::SubscriberId => {
                let address = if header.s_type == 2 {
                    IpAddr::V6(Ipv6Addr::read(&mut cursor)?)
                } else {
                    IpAddr::V4(Ipv4Addr::read(&mut cursor)?)
                };
                self.subscriber_id = Some(SubscriberId(address));
            }
            SNum::GateId => self.gate_id = Some(GateId(cursor.read_u32::<BigEndian>()?)),
            SNum::GateSpec => self.gate_spec = Some(GateSpec::read(&mut cursor)?),
            SNum::Classifiers => self.classifiers.push(Classifier {
                s_type: header.s_type,
                data: Data::from(body),
            }),
            SNum::TrafficProfile => {
                self.traffic_profile = Some(TrafficProfile::read_body(header.s_type, body)?)
            }
            SNum::GateTimeInfo => {
                self.gate_time_info = Some(GateTimeInfo(cursor.read_u32::<BigEndian>()?))
            }
            SNum::GateUsageInfo => {
                self.gate_usage_info = Some(GateUsageInfo(cursor.read_u64::<BigEndian>()?))
            }
            SNum::PcmmError => self.error = Some(PcmmError::read(&mut cursor)?),
            SNum::GateState => self.gate_state = Some(GateState::read(&mut cursor)?),
            SNum::VersionInfo => self.version_info = Some(VersionInfo::read(&mut cursor)?),
            _ => warn!(
                "skipping unsupported PCMM object S-Num {} S-Type {}",
                raw_s_num, header.s_type
            ),
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut cursor = Cursor::new(Vec::new());

        if let Some(id) = &self.transaction_id {
            write_tlv(&mut cursor, SNum::TransactionId, 1, |body| id.write(body))?;
        }
        if let Some(amid) = &self.amid {
            write_tlv(&mut cursor, SNum::Amid, 1, |body| amid.write(body))?;
        }
        if let Some(SubscriberId(address)) = &self.subscriber_id {
            match address {
                IpAddr::V4(v4) => {
                    write_tlv(&mut cursor, SNum::SubscriberId, 1, |body| v4.write(body))?
                }
                IpAddr::V6(v6) => {
                    write_tlv(&mut cursor, SNum::SubscriberId, 2, |body| v6.write(body))?
                }
            }
        }
        if let Some(GateId(id)) = self.gate_id {
            write_tlv(&mut cursor, SNum::GateId, 1, |body| id.write(body))?;
        }
        if let Some(spec) = &self.gate_spec {
            write_tlv(&mut cursor, SNum::GateSpec, 1, |body| spec.write(body))?;
        }
        for classifier in &self.classifiers {
            write_tlv(&mut cursor, SNum::Classifiers, classifier.s_type, |body| {
                classifier.data.write(body)
            })?;
        }
        if let Some(profile) = &self.traffic_profile {
            write_tlv(&mut cursor, SNum::TrafficProfile, profile.s_type(), |body| {
                profile.write_body(body)
            })?;
        }
        if let Some(GateTimeInfo(seconds)) = self.gate_time_info {
            write_tlv(&mut cursor, SNum::GateTimeInfo, 1, |body| seconds.write(body))?;
        }
        if let Some(GateUsageInfo(octets)) = self.gate_usage_info {
            write_tlv(&mut cursor, SNum::GateUsageInfo, 1, |body| octets.write(body))?;
        }
        if let Some(state) = &self.gate_state {
            write_tlv(&mut cursor, SNum::GateState, 1, |body| state.write(body))?;
        }
        if let Some(version) = &self.version_info {
            write_tlv(&mut cursor, SNum::VersionInfo, 1, |body| version.write(body))?;
        }
        if let Some(error) = &self.error {
            write_tlv(&mut cursor, SNum::PcmmError, 1, |body| error.write(body))?;
        }

        Ok(cursor.into_inner())
    }
}

fn write_tlv(
    cursor: &mut Cursor<Vec<u8>>,
    s_num: SNum,
    s_type: u8,
    write_body: impl FnOnce(&mut Cursor<Vec<u8>>) -> Result<(), Error>,
) -> Result<(), Error> {
    let mut body = Cursor::new(Vec::new());
    write_body(&mut body)?;
    let body = body.into_inner();

    let length = u16::try_from(OBJECT_HEADER_LEN + padded_len(body.len()))
        .map_err(|_| Error::BodyTooLong(body.len()))?;
    cursor.write_u16::<BigEndian>(length)?;
    s_num.write(cursor)?;
    cursor.write_u8(s_type)?;
    cursor.write_all(&body)?;
    write_padding(cursor, body.len())
}
