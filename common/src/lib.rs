pub mod constants;
pub mod messages;
pub mod sync;
