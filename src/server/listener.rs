//! Frame server: socket ownership, registration listener, orchestration
//!
//! [`StreamServer`] binds the UDP socket and runs the two long-lived tasks
//! of the protocol: the registration listener (mutates the registry) and
//! the streaming loop (snapshots it). The socket is shared; control
//! replies and frame fragments leave through the same port the clients
//! talk to.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::{Error, Result};
use crate::media::{FrameEncoder, FrameSource};
use crate::protocol::constants::CONTROL_BUFFER_SIZE;
use crate::protocol::control::{ControlMessage, ControlReply};
use crate::registry::ClientRegistry;
use crate::server::config::ServerConfig;
use crate::server::sender::FrameSender;
use crate::server::streamer::Streamer;

/// UDP frame distribution server
pub struct StreamServer {
    config: ServerConfig,
    socket: Arc<UdpSocket>,
    registry: Arc<ClientRegistry>,
    running: Arc<AtomicBool>,
}

impl StreamServer {
    /// Bind the server socket
    ///
    /// A bind failure is fatal and surfaces immediately; the session never
    /// starts.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        tracing::info!(addr = %socket.local_addr()?, "Frame server listening");

        Ok(Self {
            config,
            socket: Arc::new(socket),
            registry: Arc::new(ClientRegistry::new()),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Address the socket actually bound to (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Run the server until the frame source fails
    ///
    /// Equivalent to [`run_until`](Self::run_until) with a shutdown future
    /// that never resolves.
    pub async fn run<S, E>(&self, source: S, encoder: E) -> Result<()>
    where
        S: FrameSource + 'static,
        E: FrameEncoder + 'static,
    {
        self.run_until(source, encoder, std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// Runs the registration listener and the streaming loop until either
    /// the `shutdown` future resolves (clean stop, returns `Ok(())`) or the
    /// frame source fails (returns [`Error::Capture`]). Either way every
    /// registered client is sent a best-effort `SERVER_SHUTDOWN` notice and
    /// the registry is cleared before returning.
    pub async fn run_until<S, E, F>(&self, source: S, encoder: E, shutdown: F) -> Result<()>
    where
        S: FrameSource + 'static,
        E: FrameEncoder + 'static,
        F: Future<Output = ()>,
    {
        self.running.store(true, Ordering::SeqCst);

        let listener_handle = tokio::spawn(control_loop(
            Arc::clone(&self.socket),
            Arc::clone(&self.registry),
            Arc::clone(&self.running),
            self.config.control_read_timeout,
        ));

        let streamer = Streamer::new(
            Arc::clone(&self.registry),
            FrameSender::new(Arc::clone(&self.socket), self.config.send_timeout),
            source,
            encoder,
            self.config.clone(),
            Arc::clone(&self.running),
        );
        let mut streamer_handle = tokio::spawn(streamer.run());

        let mut streamer_finished = false;
        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            join = &mut streamer_handle => {
                streamer_finished = true;
                flatten_join(join)
            }
        };

        // Stop both tasks; the listener notices within its read timeout,
        // the streamer at its next tick.
        self.running.store(false, Ordering::SeqCst);

        self.notify_shutdown().await;

        if !streamer_finished {
            let _ = streamer_handle.await;
        }
        let _ = listener_handle.await;

        result
    }

    /// Send `SERVER_SHUTDOWN` to every registered client and clear the
    /// registry. Best-effort: no delivery confirmation, errors ignored.
    async fn notify_shutdown(&self) {
        let clients = self.registry.drain().await;
        for addr in &clients {
            let _ = self
                .socket
                .send_to(ControlReply::ServerShutdown.as_bytes(), *addr)
                .await;
        }

        if !clients.is_empty() {
            tracing::info!(clients = clients.len(), "Shutdown notice sent");
        }
    }
}

/// Registration listener: accepts control datagrams and mutates the registry
///
/// Waits with a bounded timeout so the shutdown flag is observed promptly.
/// Unrecognized messages are ignored; they are not errors.
async fn control_loop(
    socket: Arc<UdpSocket>,
    registry: Arc<ClientRegistry>,
    running: Arc<AtomicBool>,
    read_timeout: Duration,
) {
    let mut buf = [0u8; CONTROL_BUFFER_SIZE];

    while running.load(Ordering::SeqCst) {
        let (len, addr) = match tokio::time::timeout(read_timeout, socket.recv_from(&mut buf)).await
        {
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Control receive failed");
                continue;
            }
            // Bounded wait elapsed; loop around to re-check the flag.
            Err(_) => continue,
        };

        match ControlMessage::parse(&buf[..len]) {
            Some(ControlMessage::Register) => {
                if !registry.register(addr).await {
                    tracing::debug!(client = %addr, "Duplicate registration");
                }
                // Reply on every REGISTER: a client whose first confirmation
                // was lost must still hear back.
                if let Err(e) = socket
                    .send_to(ControlReply::Registered.as_bytes(), addr)
                    .await
                {
                    tracing::warn!(client = %addr, error = %e, "Failed to confirm registration");
                }
            }
            Some(ControlMessage::Unregister) => {
                registry.unregister(addr).await;
            }
            None => {
                tracing::trace!(client = %addr, len, "Ignoring unrecognized control message");
            }
        }
    }

    tracing::debug!("Registration listener stopped");
}

fn flatten_join(join: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match join {
        Ok(result) => result,
        Err(e) => Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e))),
    }
}
