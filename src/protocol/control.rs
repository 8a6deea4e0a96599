//! Control channel messages
//!
//! Subscription management rides on the same UDP socket as the frame data,
//! using plaintext tokens:
//!
//! ```text
//! Client                                   Server
//!   |------- REGISTER --------------------->|  added to registry
//!   |<------ REGISTERED --------------------|
//!   |<====== frame fragments ===============|
//!   |------- UNREGISTER ------------------->|  removed, no reply
//!   |<------ SERVER_SHUTDOWN ---------------|  (on server stop)
//! ```
//!
//! Anything that is not a recognized token is silently ignored; that makes
//! the channel forward-compatible with new tokens.

use crate::protocol::constants::{
    REGISTERED_TOKEN, REGISTER_TOKEN, SERVER_SHUTDOWN_TOKEN, UNREGISTER_TOKEN,
};

/// Inbound control message from a receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Subscribe to the frame stream
    Register,
    /// Cancel the subscription
    Unregister,
}

impl ControlMessage {
    /// Parse a control datagram; unrecognized payloads return `None`
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            p if p == REGISTER_TOKEN => Some(ControlMessage::Register),
            p if p == UNREGISTER_TOKEN => Some(ControlMessage::Unregister),
            _ => None,
        }
    }
}

/// Outbound control reply from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlReply {
    /// Subscription confirmed
    Registered,
    /// Server is stopping; no more frames will arrive
    ServerShutdown,
}

impl ControlReply {
    /// Wire payload for this reply
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            ControlReply::Registered => REGISTERED_TOKEN,
            ControlReply::ServerShutdown => SERVER_SHUTDOWN_TOKEN,
        }
    }

    /// Recognize a reply token in a received datagram
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            p if p == REGISTERED_TOKEN => Some(ControlReply::Registered),
            p if p == SERVER_SHUTDOWN_TOKEN => Some(ControlReply::ServerShutdown),
            _ => None,
        }
    }
}
