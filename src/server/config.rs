//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::constants::{
    DEFAULT_MAX_DATAGRAM_SIZE, DEFAULT_SEQUENCE_MODULUS, MIN_DATAGRAM_SIZE,
};

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the UDP socket to
    pub bind_addr: SocketAddr,

    /// Target interval between frames (~30 fps by default)
    pub frame_interval: Duration,

    /// Quality setting passed to the frame encoder (codec-defined scale)
    pub encode_quality: u8,

    /// Upper bound on a full datagram, header included
    pub max_datagram_size: usize,

    /// Sequence numbers wrap at this modulus
    pub sequence_modulus: u32,

    /// Per-datagram send bound; a recipient slower than this is evicted
    pub send_timeout: Duration,

    /// Sleep between registry checks while no clients are subscribed
    pub idle_poll_interval: Duration,

    /// Bounded wait on the control socket, so shutdown is observed promptly
    pub control_read_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8888".parse().unwrap(),
            frame_interval: Duration::from_millis(33),
            encode_quality: 50,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            sequence_modulus: DEFAULT_SEQUENCE_MODULUS,
            send_timeout: Duration::from_millis(100),
            idle_poll_interval: Duration::from_millis(100),
            control_read_timeout: Duration::from_secs(1),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the target frame interval
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Set the encoder quality setting
    pub fn encode_quality(mut self, quality: u8) -> Self {
        self.encode_quality = quality;
        self
    }

    /// Set the datagram size bound (floored at header size + 1)
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size.max(MIN_DATAGRAM_SIZE);
        self
    }

    /// Set the sequence wrap modulus (floored at 2)
    pub fn sequence_modulus(mut self, modulus: u32) -> Self {
        self.sequence_modulus = modulus.max(2);
        self
    }

    /// Set the per-datagram send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the idle polling interval
    pub fn idle_poll_interval(mut self, interval: Duration) -> Self {
        self.idle_poll_interval = interval;
        self
    }

    /// Set the control socket read timeout
    pub fn control_read_timeout(mut self, timeout: Duration) -> Self {
        self.control_read_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8888);
        assert_eq!(config.frame_interval, Duration::from_millis(33));
        assert_eq!(config.encode_quality, 50);
        assert_eq!(config.max_datagram_size, DEFAULT_MAX_DATAGRAM_SIZE);
        assert_eq!(config.sequence_modulus, DEFAULT_SEQUENCE_MODULUS);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
    }

    #[test]
    fn test_builder_datagram_size_floored() {
        // A bound that can't hold a header plus one byte is useless
        let config = ServerConfig::default().max_datagram_size(4);

        assert_eq!(config.max_datagram_size, MIN_DATAGRAM_SIZE);
    }

    #[test]
    fn test_builder_sequence_modulus_floored() {
        let config = ServerConfig::default().sequence_modulus(0);

        assert_eq!(config.sequence_modulus, 2);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8890".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .frame_interval(Duration::from_millis(16))
            .encode_quality(80)
            .max_datagram_size(1400)
            .sequence_modulus(1024)
            .send_timeout(Duration::from_millis(50))
            .idle_poll_interval(Duration::from_millis(10))
            .control_read_timeout(Duration::from_millis(250));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.frame_interval, Duration::from_millis(16));
        assert_eq!(config.encode_quality, 80);
        assert_eq!(config.max_datagram_size, 1400);
        assert_eq!(config.sequence_modulus, 1024);
        assert_eq!(config.send_timeout, Duration::from_millis(50));
        assert_eq!(config.idle_poll_interval, Duration::from_millis(10));
        assert_eq!(config.control_read_timeout, Duration::from_millis(250));
    }
}
