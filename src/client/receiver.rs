//! Frame stream receiver
//!
//! Subscribes to a [`StreamServer`](crate::server::StreamServer), receives
//! fragment datagrams, reassembles them into complete frames, and hands the
//! frames to the caller over an event channel. Delivery is best-effort:
//! frames with lost fragments are silently superseded by the next frame.

use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::client::config::ClientConfig;
use crate::error::{Error, Result};
use crate::protocol::constants::{REGISTER_TOKEN, UNREGISTER_TOKEN};
use crate::protocol::control::ControlReply;
use crate::protocol::fragment::{Fragment, FrameAssembler};

/// Events from the stream receiver
#[derive(Debug)]
pub enum ReceiverEvent {
    /// Subscription confirmed by the server
    Registered,
    /// A complete reassembled frame (encoded bytes)
    Frame(Bytes),
    /// The server announced shutdown; no more frames will arrive
    ServerShutdown,
}

/// UDP frame stream receiver
///
/// # Example
/// ```no_run
/// use framecast::client::{ClientConfig, StreamReceiver};
///
/// # async fn example() -> framecast::error::Result<()> {
/// let config = ClientConfig::new("127.0.0.1:8888".parse().unwrap());
/// let (mut receiver, mut events) = StreamReceiver::new(config);
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("Event: {:?}", event);
///     }
/// });
///
/// receiver.connect().await?;
/// receiver.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct StreamReceiver {
    config: ClientConfig,
    socket: Option<Arc<UdpSocket>>,
    events: mpsc::Sender<ReceiverEvent>,
}

impl StreamReceiver {
    /// Create a receiver and the event channel it reports on
    pub fn new(config: ClientConfig) -> (Self, mpsc::Receiver<ReceiverEvent>) {
        let (tx, rx) = mpsc::channel(config.event_buffer);
        (
            Self {
                config,
                socket: None,
                events: tx,
            },
            rx,
        )
    }

    /// Register with the server and wait for confirmation
    ///
    /// Binds an ephemeral local port, sends `REGISTER`, and waits up to the
    /// configured timeout for `REGISTERED`. Data fragments arriving before
    /// the confirmation are discarded; the stream is lossy anyway.
    pub async fn connect(&mut self) -> Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(self.config.server_addr).await?;
        let socket = Arc::new(socket);

        socket.send(REGISTER_TOKEN).await?;
        tracing::debug!(server = %self.config.server_addr, "Registration sent");

        let mut buf = vec![0u8; self.config.recv_buffer_size];
        let deadline = tokio::time::Instant::now() + self.config.register_timeout;

        loop {
            let len = match tokio::time::timeout_at(deadline, socket.recv(&mut buf)).await {
                Ok(received) => received?,
                Err(_) => return Err(Error::RegisterTimeout(self.config.server_addr)),
            };

            if ControlReply::parse(&buf[..len]) == Some(ControlReply::Registered) {
                break;
            }
        }

        tracing::info!(server = %self.config.server_addr, "Registered");
        self.socket = Some(socket);
        let _ = self.events.send(ReceiverEvent::Registered).await;

        Ok(())
    }

    /// Receive and reassemble frames until the server shuts down
    ///
    /// Emits [`ReceiverEvent::Frame`] for every completely reassembled
    /// frame and [`ReceiverEvent::ServerShutdown`] (then returns) when the
    /// server announces shutdown. Also returns cleanly if the caller drops
    /// the event receiver.
    pub async fn run(&mut self) -> Result<()> {
        let socket = self.connected_socket()?;

        let mut buf = vec![0u8; self.config.recv_buffer_size];
        let mut assembler = FrameAssembler::new();

        loop {
            let len = socket.recv(&mut buf).await?;
            let payload = &buf[..len];

            match ControlReply::parse(payload) {
                Some(ControlReply::ServerShutdown) => {
                    tracing::info!(server = %self.config.server_addr, "Server shutting down");
                    let _ = self.events.send(ReceiverEvent::ServerShutdown).await;
                    return Ok(());
                }
                // Duplicate confirmation from a re-register; not data.
                Some(ControlReply::Registered) => continue,
                None => {}
            }

            let fragment = match Fragment::from_datagram(Bytes::copy_from_slice(payload)) {
                Ok(fragment) => fragment,
                Err(e) => {
                    tracing::debug!(error = %e, len, "Ignoring malformed datagram");
                    continue;
                }
            };

            match assembler.push(fragment) {
                Ok(Some(frame)) => {
                    if self.events.send(ReceiverEvent::Frame(frame)).await.is_err() {
                        // Caller went away; stop receiving.
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "Dropping inconsistent fragment");
                }
            }
        }
    }

    /// Cancel the subscription (best-effort, no confirmation)
    pub async fn disconnect(&mut self) -> Result<()> {
        let socket = self.connected_socket()?;
        socket.send(UNREGISTER_TOKEN).await?;
        tracing::info!(server = %self.config.server_addr, "Unregistered");
        self.socket = None;
        Ok(())
    }

    fn connected_socket(&self) -> Result<Arc<UdpSocket>> {
        self.socket.clone().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "receiver is not connected",
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::protocol::constants::SERVER_SHUTDOWN_TOKEN;
    use crate::protocol::fragment::fragment_frame;

    /// Minimal scripted server on a raw socket.
    async fn fake_server() -> (Arc<UdpSocket>, std::net::SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        (Arc::new(socket), addr)
    }

    async fn expect_register(socket: &UdpSocket) -> std::net::SocketAddr {
        let mut buf = [0u8; 64];
        let (len, addr) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..len], REGISTER_TOKEN);
        addr
    }

    #[tokio::test]
    async fn test_connect_registers_and_confirms() {
        let (server, server_addr) = fake_server().await;

        let config = ClientConfig::new(server_addr).register_timeout(Duration::from_secs(2));
        let (mut receiver, mut events) = StreamReceiver::new(config);

        let server_task = tokio::spawn(async move {
            let client_addr = expect_register(&server).await;
            server.send_to(b"REGISTERED", client_addr).await.unwrap();
        });

        receiver.connect().await.unwrap();
        server_task.await.unwrap();

        assert!(matches!(
            events.recv().await,
            Some(ReceiverEvent::Registered)
        ));
    }

    #[tokio::test]
    async fn test_connect_times_out_without_confirmation() {
        let (_server, server_addr) = fake_server().await;

        let config = ClientConfig::new(server_addr).register_timeout(Duration::from_millis(50));
        let (mut receiver, _events) = StreamReceiver::new(config);

        let result = receiver.connect().await;
        assert!(matches!(result, Err(Error::RegisterTimeout(_))));
    }

    #[tokio::test]
    async fn test_run_reassembles_frames_until_shutdown() {
        let (server, server_addr) = fake_server().await;

        let config = ClientConfig::new(server_addr).register_timeout(Duration::from_secs(2));
        let (mut receiver, mut events) = StreamReceiver::new(config);

        let frame: Bytes = (0..500u32).map(|i| i as u8).collect::<Vec<_>>().into();
        let frame_clone = frame.clone();

        let server_task = tokio::spawn(async move {
            let client_addr = expect_register(&server).await;
            server.send_to(b"REGISTERED", client_addr).await.unwrap();

            for fragment in fragment_frame(1, frame_clone, 128).unwrap() {
                server
                    .send_to(&fragment.datagram(), client_addr)
                    .await
                    .unwrap();
            }
            server
                .send_to(SERVER_SHUTDOWN_TOKEN, client_addr)
                .await
                .unwrap();
        });

        receiver.connect().await.unwrap();
        receiver.run().await.unwrap();
        server_task.await.unwrap();

        assert!(matches!(
            events.recv().await,
            Some(ReceiverEvent::Registered)
        ));
        match events.recv().await {
            Some(ReceiverEvent::Frame(received)) => assert_eq!(received, frame),
            other => panic!("expected frame event, got {:?}", other),
        }
        assert!(matches!(
            events.recv().await,
            Some(ReceiverEvent::ServerShutdown)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_sends_unregister() {
        let (server, server_addr) = fake_server().await;

        let config = ClientConfig::new(server_addr).register_timeout(Duration::from_secs(2));
        let (mut receiver, _events) = StreamReceiver::new(config);

        let server_task = tokio::spawn(async move {
            let client_addr = expect_register(&server).await;
            server.send_to(b"REGISTERED", client_addr).await.unwrap();

            let mut buf = [0u8; 64];
            let (len, _) = tokio::time::timeout(Duration::from_secs(2), server.recv_from(&mut buf))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&buf[..len], UNREGISTER_TOKEN);
        });

        receiver.connect().await.unwrap();
        receiver.disconnect().await.unwrap();
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_before_connect_fails() {
        let (_server, server_addr) = fake_server().await;
        let (mut receiver, _events) = StreamReceiver::new(ClientConfig::new(server_addr));

        let result = receiver.run().await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
