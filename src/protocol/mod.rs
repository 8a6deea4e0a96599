//! Wire protocol: frame fragmentation and the control channel
//!
//! Everything travels over UDP. Frame data is fragmented into bounded
//! datagrams with a 12-byte reassembly header ([`fragment`]); subscription
//! management uses plaintext tokens on the same socket ([`control`]).
//! All integer fields are big-endian.

pub mod constants;
pub mod control;
pub mod fragment;

pub use constants::{
    DEFAULT_MAX_DATAGRAM_SIZE, DEFAULT_SEQUENCE_MODULUS, HEADER_SIZE, MAX_FRAGMENTS_PER_FRAME,
    MIN_DATAGRAM_SIZE,
};
pub use control::{ControlMessage, ControlReply};
pub use fragment::{fragment_frame, Fragment, FragmentHeader, FrameAssembler};
