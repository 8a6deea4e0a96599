//! Receiver configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Receiver configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to subscribe to
    pub server_addr: SocketAddr,

    /// How long to wait for the REGISTERED confirmation
    pub register_timeout: Duration,

    /// Receive buffer size; must hold the largest expected datagram
    pub recv_buffer_size: usize,

    /// Capacity of the event channel handed to the caller
    pub event_buffer: usize,
}

impl ClientConfig {
    /// Create a config for the given server address
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            register_timeout: Duration::from_secs(5),
            recv_buffer_size: 65536,
            event_buffer: 64,
        }
    }

    /// Set the registration timeout
    pub fn register_timeout(mut self, timeout: Duration) -> Self {
        self.register_timeout = timeout;
        self
    }

    /// Set the receive buffer size
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Set the event channel capacity (floored at 1)
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }
}
