//! Wire protocol constants

/// Fragment header size in bytes: three big-endian u32 fields
/// (sequence number, total fragment count, fragment index)
pub const HEADER_SIZE: usize = 12;

/// Default upper bound on a full datagram (header + payload)
///
/// Kept well under the 65507-byte UDP payload limit so the OS never has to
/// reject a datagram outright.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 60000;

/// Smallest usable datagram bound: a header plus at least one payload byte
pub const MIN_DATAGRAM_SIZE: usize = HEADER_SIZE + 1;

/// Upper bound on the fragment count of a single frame
///
/// At the default datagram size this admits frames up to roughly 245 MB,
/// orders of magnitude beyond any encoded video frame. The assembler
/// sizes its reassembly buffer from the header's total count, so the
/// count must be bounded before any allocation happens.
pub const MAX_FRAGMENTS_PER_FRAME: u32 = 4096;

/// Default sequence number wrap modulus
pub const DEFAULT_SEQUENCE_MODULUS: u32 = 65536;

/// Control token: client requests a subscription
pub const REGISTER_TOKEN: &[u8] = b"REGISTER";

/// Control token: client cancels its subscription
pub const UNREGISTER_TOKEN: &[u8] = b"UNREGISTER";

/// Reply token: subscription confirmed
pub const REGISTERED_TOKEN: &[u8] = b"REGISTERED";

/// Reply token: server is shutting down, no more frames will arrive
pub const SERVER_SHUTDOWN_TOKEN: &[u8] = b"SERVER_SHUTDOWN";

/// Receive buffer size for control messages (tokens are tiny)
pub const CONTROL_BUFFER_SIZE: usize = 1024;
