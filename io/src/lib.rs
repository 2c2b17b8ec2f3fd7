#![deny(rust_2018_idioms)]

mod pool;
mod server;
mod tcp;

pub use pool::*;
pub use server::*;
pub use tcp::*;

use common::messages::Error;
use std::{
    error::Error as StdError,
    fmt::{self, Debug, Display, Formatter},
    io,
};

#[derive(Debug)]
pub enum TransportError {
    /// One message could not be decoded or encoded. The stream is still framed correctly.
    Recoverable { source: Source, error: Error },
    Fatal { source: Source, error: io::Error },
    /// The peer closed the stream, or the local side shut it down.
    Closed(Source),
}

impl TransportError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable { .. })
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable { source, error } =>
                write!(f, "recoverable error in {:?}: {}", source, error),
            Self::Fatal { source, error } => write!(f, "fatal error in {:?}: {}", source, error),
            Self::Closed(source) => write!(f, "connection closed in {:?}", source),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Recoverable { error, .. } => Some(error),
            Self::Fatal { error, .. } => Some(error),
            Self::Closed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    ReadCops,
    WriteCops,
    Listener,
}

#[derive(Debug)]
pub struct SendError(pub Source);

impl Display for SendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "send error in {:?}", self.0)
    }
}

impl StdError for SendError {}

impl From<SendError> for TransportError {
    fn from(error: SendError) -> Self {
        Self::Closed(error.0)
    }
}
