//! Frame distribution server
//!
//! One UDP socket, two concurrent tasks:
//!
//! - the **registration listener** ([`listener`]) accepts REGISTER /
//!   UNREGISTER control messages and mutates the client registry;
//! - the **streaming loop** ([`streamer`]) captures, encodes, fragments and
//!   sends frames to a snapshot of the registry, evicting recipients that
//!   fail.
//!
//! The registry is the only shared mutable state between them.

pub mod config;
pub mod listener;
pub mod sender;
pub mod streamer;

pub use config::ServerConfig;
pub use listener::StreamServer;
pub use sender::{FragmentTransport, FrameSender};
pub use streamer::{StreamPhase, Streamer};
