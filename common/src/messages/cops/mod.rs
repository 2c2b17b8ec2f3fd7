//! COPS (RFC 2748) messages and objects.

mod header;
mod message;
mod objects;

pub use header::*;
pub use message::*;
pub use objects::*;
