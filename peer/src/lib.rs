#![deny(rust_2018_idioms)]
#![allow(clippy::new_without_default, clippy::ptr_arg)]

use crate::{pdp_handler::PdpInform, pep_handler::PepInform};

pub mod cmts;
pub mod helpers;
pub mod keep_alive;
pub mod request_state;
pub mod session;

// The handlers only return errors when the peer violates the protocol. Anything the protocol
// itself answers, such as a close or a failure report, is written out and raised as an event.
pub mod pdp_handler;
pub mod pep_handler;

/// C-Num and C-Type of the Integrity object, as named in an error subcode.
pub(crate) const INTEGRITY_SUBCODE: u16 = (16 << 8) | 1;

pub enum InformEvent {
    PepInform(PepInform),
    PdpInform(PdpInform),
}

#[cold]
pub(crate) fn debug<T: std::fmt::Debug>(val: &T) -> String {
    format!("{:?}", val)
}
