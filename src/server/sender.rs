//! Per-client frame transmission
//!
//! Delivers the fragments of one frame to every registered recipient over
//! unreliable datagrams. Failures are isolated per recipient: an error or
//! timeout sending to one address never affects the others, and the failed
//! set is returned to the caller for eviction. There are no retries at this
//! layer; the protocol is best-effort by design.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::protocol::fragment::Fragment;

/// Datagram-oriented transport seam
///
/// Implemented for `tokio::net::UdpSocket`; tests substitute transports
/// that fail for chosen addresses.
#[async_trait]
pub trait FragmentTransport: Send + Sync {
    /// Send one datagram to `addr`
    async fn send_to(&self, payload: &[u8], addr: SocketAddr) -> std::io::Result<usize>;
}

#[async_trait]
impl FragmentTransport for UdpSocket {
    async fn send_to(&self, payload: &[u8], addr: SocketAddr) -> std::io::Result<usize> {
        UdpSocket::send_to(self, payload, addr).await
    }
}

/// Sends fragmented frames to a set of recipients
pub struct FrameSender<T: FragmentTransport> {
    transport: Arc<T>,
    send_timeout: Duration,
}

impl<T: FragmentTransport> FrameSender<T> {
    /// Create a sender over the given transport
    pub fn new(transport: Arc<T>, send_timeout: Duration) -> Self {
        Self {
            transport,
            send_timeout,
        }
    }

    /// Send every fragment of a frame to every recipient
    ///
    /// Fragments go out in index order per recipient. On the first failed
    /// or timed-out send to a recipient, that recipient's remaining
    /// fragments are abandoned (the frame is already unrecoverable for it)
    /// and the address is included in the returned failed set. Other
    /// recipients are unaffected.
    pub async fn send_frame(
        &self,
        fragments: &[Fragment],
        recipients: &[SocketAddr],
    ) -> Vec<SocketAddr> {
        // Wire datagrams are built once and shared across recipients.
        let datagrams: Vec<Bytes> = fragments.iter().map(Fragment::datagram).collect();

        let mut failed = Vec::new();

        for &addr in recipients {
            if let Err(e) = self.send_all(&datagrams, addr).await {
                tracing::warn!(client = %addr, error = %e, "Send failed, marking for eviction");
                failed.push(addr);
            }
        }

        failed
    }

    async fn send_all(&self, datagrams: &[Bytes], addr: SocketAddr) -> std::io::Result<()> {
        for datagram in datagrams {
            match tokio::time::timeout(self.send_timeout, self.transport.send_to(datagram, addr))
                .await
            {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "datagram send timed out",
                    ))
                }
            }
        }
        Ok(())
    }
}
