use super::{Error, MessageComponent};
use std::{
    fmt,
    io::{Cursor, Read, Write},
};

/// An immutable byte string with an exact length.
///
/// Equality, ordering and hashing cover exactly the held bytes, so two handles compare equal
/// regardless of the buffers they were cut from.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Data(Vec<u8>);

impl Data {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Copies `len` bytes of `buf` starting at `offset`.
    pub fn from_slice(buf: &[u8], offset: usize, len: usize) -> Result<Self, Error> {
        let end = offset.checked_add(len);
        match end {
            Some(end) if end <= buf.len() => Ok(Self(buf[offset .. end].to_vec())),
            _ => Err(Error::DataOutOfBounds {
                offset,
                len,
                available: buf.len(),
            }),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Data {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Data {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for Data {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printable = !self.0.is_empty()
            && self
                .0
                .iter()
                .all(|byte| byte.is_ascii_graphic() || *byte == b' ');
        if printable {
            write!(f, "Data({:?})", String::from_utf8_lossy(&self.0))
        } else {
            write!(f, "Data(0x")?;
            for byte in &self.0 {
                write!(f, "{:02x}", byte)?;
            }
            write!(f, ")")
        }
    }
}

/// Reads every byte left in the cursor, so it must be given a cursor over exactly one body.
impl MessageComponent for Data {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let mut dest = Vec::new();
        cursor.read_to_end(&mut dest)?;
        Ok(Self(dest))
    }

    fn write(&self, cursor: &mut Cursor<Vec<u8>>) -> Result<(), Error> {
        cursor.write_all(&self.0).map_err(Into::into)
    }
}
