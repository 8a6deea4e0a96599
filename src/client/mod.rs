//! Receiving side of the protocol
//!
//! Provides a subscriber client for:
//! - Registering with a frame server and tracking the subscription
//! - Reassembling fragment datagrams into complete encoded frames

pub mod config;
pub mod receiver;

pub use config::ClientConfig;
pub use receiver::{ReceiverEvent, StreamReceiver};
