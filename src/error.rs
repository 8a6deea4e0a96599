//! Error types for the framecast library
//!
//! Only fatal conditions propagate out of the core as errors: a failed
//! socket bind and a lost frame source. Per-recipient transport failures
//! never surface here; they are reported as eviction sets by the sender.

use std::net::SocketAddr;

/// Convenience result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error (socket bind, send, receive)
    Io(std::io::Error),
    /// Wire protocol violation
    Protocol(ProtocolError),
    /// Frame source failed; fatal to the streaming session
    Capture(SourceError),
    /// Frame encoding failed
    Encode(EncodeError),
    /// Registration handshake with the server did not complete in time
    RegisterTimeout(SocketAddr),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Capture(e) => write!(f, "Capture error: {}", e),
            Error::Encode(e) => write!(f, "Encode error: {}", e),
            Error::RegisterTimeout(addr) => {
                write!(f, "No registration confirmation from {}", addr)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Capture(e) => Some(e),
            Error::Encode(e) => Some(e),
            Error::RegisterTimeout(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<SourceError> for Error {
    fn from(e: SourceError) -> Self {
        Error::Capture(e)
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Error::Encode(e)
    }
}

/// Wire protocol errors (fragment header codec and reassembly)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Configured datagram size cannot hold a header plus any payload
    DatagramSizeTooSmall { size: usize, min: usize },
    /// Datagram shorter than the fragment header
    ShortHeader { len: usize },
    /// Fragment's total count disagrees with earlier fragments of the frame
    FragmentCountMismatch {
        sequence: u32,
        expected: u32,
        got: u32,
    },
    /// Fragment index not in `[0, total)`
    IndexOutOfRange { index: u32, total: u32 },
    /// Fragment's total count exceeds the per-frame limit
    FragmentCountTooLarge { total: u32, max: u32 },
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::DatagramSizeTooSmall { size, min } => {
                write!(f, "Max datagram size {} below minimum {}", size, min)
            }
            ProtocolError::ShortHeader { len } => {
                write!(f, "Datagram too short for fragment header: {} bytes", len)
            }
            ProtocolError::FragmentCountMismatch {
                sequence,
                expected,
                got,
            } => write!(
                f,
                "Fragment count mismatch for frame {}: expected {}, got {}",
                sequence, expected, got
            ),
            ProtocolError::IndexOutOfRange { index, total } => {
                write!(f, "Fragment index {} out of range (total {})", index, total)
            }
            ProtocolError::FragmentCountTooLarge { total, max } => {
                write!(f, "Fragment count {} exceeds per-frame limit {}", total, max)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Frame source (capture) errors
#[derive(Debug, Clone)]
pub enum SourceError {
    /// Device could not be opened
    Unavailable(String),
    /// A frame could not be read from an open device
    ReadFailed(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unavailable(msg) => write!(f, "Frame source unavailable: {}", msg),
            SourceError::ReadFailed(msg) => write!(f, "Frame read failed: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

/// Frame encoder errors
#[derive(Debug, Clone)]
pub struct EncodeError(pub String);

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame encode failed: {}", self.0)
    }
}

impl std::error::Error for EncodeError {}
