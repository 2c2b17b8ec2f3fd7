use crate::{
    constants::{COMMON_HEADER_LEN, COPS_VERSION, MAX_MESSAGE_LEN, OBJECT_HEADER_LEN},
    messages::{Error, MessageComponent},
};
use bitflags::bitflags;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use parser::MessageComponent;
use std::io::Cursor;

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    #[parse(fallback)]
    Na = 0,
    Request = 1,
    Decision = 2,
    Report = 3,
    DeleteRequestState = 4,
    SyncStateRequest = 5,
    ClientOpen = 6,
    ClientAccept = 7,
    ClientClose = 8,
    KeepAlive = 9,
    SyncStateComplete = 10,
}

impl OpCode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Na => "NA",
            Self::Request => "REQ",
            Self::Decision => "DEC",
            Self::Report => "RPT",
            Self::DeleteRequestState => "DRQ",
            Self::SyncStateRequest => "SSQ",
            Self::ClientOpen => "OPN",
            Self::ClientAccept => "CAT",
            Self::ClientClose => "CC",
            Self::KeepAlive => "KA",
            Self::SyncStateComplete => "SSC",
        }
    }
}

bitflags! {
    /// Low nibble of the first header byte.
    pub struct HeaderFlags: u8 {
        const SOLICITED = 0x01;
    }
}

/// The 8 byte common header minus its length field, which is derived when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub version: u8,
    pub flags: HeaderFlags,
    pub op_code: OpCode,
    pub client_type: u16,
}

impl MessageHeader {
    pub fn new(op_code: OpCode, client_type: u16) -> Self {
        Self {
            version: COPS_VERSION,
            flags: HeaderFlags::empty(),
            op_code,
            client_type,
        }
    }

    pub fn solicited(mut self) -> Self {
        self.flags.insert(HeaderFlags::SOLICITED);
        self
    }

    pub fn is_solicited(&self) -> bool {
        self.flags.contains(HeaderFlags::SOLICITED)
    }

    /// Reads the header and returns it with the message's total length.
    pub fn read(cursor: &mut Cursor<&[u8]>) -> Result<(Self, u32), Error> {
        let first = cursor.read_u8()?;
        let version = first >> 4;
        if version == 0 {
            return Err(Error::BadVersion(version));
        }

        let op_code = OpCode::read(cursor)?;
        let client_type = cursor.read_u16::<BigEndian>()?;
        let total_len = cursor.read_u32::<BigEndian>()?;
        check_total_len(total_len)?;

        Ok((
            Self {
                version,
                flags: HeaderFlags::from_bits_truncate(first & 0x0f),
                op_code,
                client_type,
            },
            total_len,
        ))
    }

    pub fn write(&self, cursor: &mut Cursor<Vec<u8>>, total_len: u32) -> Result<(), Error> {
        cursor.write_u8((self.version << 4) | (self.flags.bits() & 0x0f))?;
        self.op_code.write(cursor)?;
        cursor.write_u16::<BigEndian>(self.client_type)?;
        cursor.write_u32::<BigEndian>(total_len)?;
        Ok(())
    }
}

/// Validates the length field of a common header.
pub fn check_total_len(total_len: u32) -> Result<(), Error> {
    if (total_len as usize) < COMMON_HEADER_LEN || total_len % 4 != 0 || total_len > MAX_MESSAGE_LEN
    {
        return Err(Error::BadLength(total_len));
    }
    Ok(())
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CNum {
    #[parse(fallback)]
    Na = 0,
    Handle = 1,
    Context = 2,
    InInterface = 3,
    OutInterface = 4,
    Reason = 5,
    Decision = 6,
    LocalDecision = 7,
    Error = 8,
    ClientSi = 9,
    KaTimer = 10,
    PepId = 11,
    ReportType = 12,
    PdpRedirect = 13,
    LastPdpAddress = 14,
    AcctTimer = 15,
    Integrity = 16,
}

impl CNum {
    pub fn name(self) -> &'static str {
        match self {
            Self::Na => "unknown",
            Self::Handle => "Handle",
            Self::Context => "Context",
            Self::InInterface => "In-Interface",
            Self::OutInterface => "Out-Interface",
            Self::Reason => "Reason",
            Self::Decision => "Decision",
            Self::LocalDecision => "LPDP Decision",
            Self::Error => "Error",
            Self::ClientSi => "ClientSI",
            Self::KaTimer => "Keep-Alive Timer",
            Self::PepId => "PEPID",
            Self::ReportType => "Report-Type",
            Self::PdpRedirect => "PDP Redirect Address",
            Self::LastPdpAddress => "Last PDP Address",
            Self::AcctTimer => "Accounting Timer",
            Self::Integrity => "Message Integrity",
        }
    }

    /// Whether `c_type` is a variant this object may carry.
    pub fn allows(self, c_type: CType) -> bool {
        use CType::*;
        match self {
            Self::Na => true,
            Self::Decision | Self::LocalDecision => {
                matches!(c_type, Def | Stateless | Repl | Csi | Named)
            }
            Self::InInterface | Self::OutInterface | Self::PdpRedirect | Self::LastPdpAddress => {
                matches!(c_type, Def | Stateless)
            }
            Self::ClientSi => matches!(c_type, Def | Stateless),
            _ => c_type == Def,
        }
    }
}

#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CType {
    #[parse(fallback)]
    Na = 0,
    Def = 1,
    Stateless = 2,
    Repl = 3,
    Csi = 4,
    Named = 5,
}

impl CType {
    pub const IPV4: Self = Self::Def;
    pub const IPV6: Self = Self::Stateless;
    pub const SIGNALED: Self = Self::Def;
    pub const NAMED_SI: Self = Self::Stateless;
}

/// The 4 byte header in front of every object. `length` counts the header and body but not the
/// padding that follows.
#[derive(MessageComponent, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    pub length: u16,
    pub c_num: CNum,
    pub c_type: CType,
}

impl ObjectHeader {
    pub fn body_len(&self) -> Option<usize> {
        usize::from(self.length).checked_sub(OBJECT_HEADER_LEN)
    }
}
