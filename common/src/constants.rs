/// Version carried in the common header of every COPS message.
pub const COPS_VERSION: u8 = 1;

/// Client-type of PacketCable Multimedia.
pub const PCMM_CLIENT_TYPE: u16 = 0x800A;

/// Well-known COPS port.
pub const COPS_PORT: u16 = 3288;
/// Port a CMTS listens on for PCMM policy servers.
pub const PCMM_PORT: u16 = 3918;

/// Keep-alive interval offered by a PDP, in seconds.
pub const DEFAULT_KA_TIMER: u16 = 30;
/// Accounting interval offered by a PDP, in seconds. Zero omits the timer.
pub const DEFAULT_ACCT_TIMER: u16 = 0;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 2000;

pub const COMMON_HEADER_LEN: usize = 8;
pub const OBJECT_HEADER_LEN: usize = 4;

/// Upper bound on the total length of a single message accepted off the wire.
pub const MAX_MESSAGE_LEN: u32 = 1 << 20;

pub const PCMM_MAJOR_VERSION: u16 = 5;
pub const PCMM_MINOR_VERSION: u16 = 0;
