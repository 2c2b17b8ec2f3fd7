use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::{
    convert::Infallible,
    io::{self, Cursor, Read, Write},
    net::{Ipv4Addr, Ipv6Addr},
    num::TryFromIntError,
    string::FromUtf8Error,
};

pub trait MessageComponent: Sized {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error>;

    fn write(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    StdIo(#[from] io::Error),
    #[error("invalid string: {0}")]
    InvalidString(#[from] FromUtf8Error),
    #[error("encountered invalid enum value for enum {name}: {value}")]
    InvalidEnumValue { name: &'static str, value: u32 },
    #[error("encountered a length parameter too long to fit in a usize")]
    LengthTooLong(#[from] TryFromIntError),
    #[error("unsupported protocol version {0}")]
    BadVersion(u8),
    #[error("message length {0} is not a multiple of 4 of at least 8")]
    BadLength(u32),
    #[error("object {c_num} declares length {length} which does not fit the message")]
    BadObjectLength { c_num: u8, length: u16 },
    #[error("C-Type {c_type} is not legal for C-Num {c_num}")]
    IllegalCType { c_num: u8, c_type: u8 },
    #[error("object {c_num} is not expected in a {message} message")]
    UnexpectedObject { message: &'static str, c_num: u8 },
    #[error("unknown object with C-Num {c_num} and C-Type {c_type}")]
    UnknownObject { c_num: u8, c_type: u8 },
    #[error("object {c_num} appears more than once in a {message} message")]
    DuplicateObject { message: &'static str, c_num: u8 },
    #[error("{message} message is missing its mandatory {object} object")]
    MandatoryObjectMissing {
        message: &'static str,
        object: &'static str,
    },
    #[error("invalid decision message: {0}")]
    InvalidDecision(&'static str),
    #[error("bad message format: {0}")]
    BadMessageFormat(&'static str),
    #[error("{len} bytes at offset {offset} exceed the {available} available")]
    DataOutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },
    #[error("{remaining} unread bytes left in {name} body")]
    TrailingBytes { name: &'static str, remaining: usize },
    #[error("encoded body of {0} bytes does not fit a 16 bit length")]
    BodyTooLong(usize),
}

impl From<Infallible> for Error {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

impl MessageComponent for u8 {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        cursor.read_u8().map_err(Into::into)
    }

    fn write(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        cursor.write_u8(*self).map_err(Into::into)
    }
}

impl MessageComponent for u16 {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        cursor.read_u16::<BigEndian>().map_err(Into::into)
    }

    fn write(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        cursor.write_u16::<BigEndian>(*self).map_err(Into::into)
    }
}

impl MessageComponent for u32 {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        cursor.read_u32::<BigEndian>().map_err(Into::into)
    }

    fn write(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        cursor.write_u32::<BigEndian>(*self).map_err(Into::into)
    }
}

impl MessageComponent for u64 {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        cursor.read_u64::<BigEndian>().map_err(Into::into)
    }

    fn write(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        cursor.write_u64::<BigEndian>(*self).map_err(Into::into)
    }
}

impl<const N: usize> MessageComponent for [u8; N] {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let mut dest = [0u8; N];
        cursor.read_exact(&mut dest)?;
        Ok(dest)
    }

    fn write(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        cursor.write_all(self.as_slice()).map_err(Into::into)
    }
}

impl MessageComponent for Ipv4Addr {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        <[u8; 4]>::read(cursor).map(Self::from)
    }

    fn write(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        self.octets().write(cursor)
    }
}

impl MessageComponent for Ipv6Addr {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        <[u8; 16]>::read(cursor).map(Self::from)
    }

    fn write(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        self.octets().write(cursor)
    }
}

/// `N` reserved bytes: skipped on read, written as zeros.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reserved<const N: usize>;

impl<const N: usize> MessageComponent for Reserved<N> {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        <[u8; N]>::read(cursor).map(|_| Self)
    }

    fn write(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        [0u8; N].write(cursor)
    }
}

/// Number of zero bytes needed to bring `len` up to a 4 byte boundary.
pub const fn padding_for(len: usize) -> usize {
    (4 - len % 4) % 4
}

pub const fn padded_len(len: usize) -> usize {
    len + padding_for(len)
}

pub(crate) fn write_padding(cursor: &mut Cursor<Vec<u8>>, len: usize) -> Result<(), Error> {
    const ZEROS: [u8; 3] = [0; 3];
    cursor
        .write_all(&ZEROS[.. padding_for(len)])
        .map_err(Into::into)
}

pub(crate) fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    let position = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
    cursor.get_ref().len().saturating_sub(position)
}
