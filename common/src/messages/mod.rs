mod data;
mod message_component;
pub use data::Data;
pub use message_component::*;
pub mod cops;
pub mod pcmm;

macro_rules! impl_bitflags_message_component {
    ($name:ident, $int:ty) => {
        impl MessageComponent for $name {
            fn read(cursor: &mut ::std::io::Cursor<&[u8]>) -> Result<Self, Error> {
                let flags = <$int as MessageComponent>::read(cursor)?;
                Ok(Self::from_bits_truncate(flags))
            }

            fn write(&self, cursor: &mut ::std::io::Cursor<Vec<u8>>) -> Result<(), Error> {
                self.bits().write(cursor)
            }
        }
    };
}

pub(crate) use impl_bitflags_message_component;
