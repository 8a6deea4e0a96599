//! Streaming loop
//!
//! The producer side of the protocol: capture a frame, encode it, fragment
//! it, send it to every registered client, pace to the target frame
//! interval. The loop has two phases:
//!
//! ```text
//!          ≥1 client registered
//!   IDLE ──────────────────────► STREAMING
//!    ▲      acquire source           │ per tick: capture → encode →
//!    │                               │ fragment → send → evict failed
//!    └───────────────────────────────┘
//!          registry empty
//!          release source
//! ```
//!
//! The frame source is held open only while streaming, and one frame is
//! fully sent (or abandoned) before the next capture begins, so fragments
//! of different frames never interleave on the wire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::MissedTickBehavior;

use crate::error::{Error, Result};
use crate::media::{FrameEncoder, FrameSource, SourceHandle};
use crate::protocol::fragment::fragment_frame;
use crate::registry::ClientRegistry;
use crate::server::config::ServerConfig;
use crate::server::sender::{FragmentTransport, FrameSender};
use crate::stats::DeliveryStats;

/// Streaming loop phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No clients registered; the frame source is closed
    Idle,
    /// At least one client registered; capturing and sending every tick
    Streaming,
}

/// The frame production and distribution loop
///
/// Sole reader of the frame source and sole caller of the fragmenter and
/// sender. Shares only the [`ClientRegistry`] with the registration
/// listener.
pub struct Streamer<S, E, T>
where
    S: FrameSource,
    E: FrameEncoder,
    T: FragmentTransport,
{
    registry: Arc<ClientRegistry>,
    sender: FrameSender<T>,
    source: SourceHandle<S>,
    encoder: E,
    config: ServerConfig,
    running: Arc<AtomicBool>,
    phase: StreamPhase,
    sequence: u32,
    stats: DeliveryStats,
}

impl<S, E, T> Streamer<S, E, T>
where
    S: FrameSource,
    E: FrameEncoder,
    T: FragmentTransport,
{
    /// Create a streamer; the source starts closed and the loop idle
    pub fn new(
        registry: Arc<ClientRegistry>,
        sender: FrameSender<T>,
        source: S,
        encoder: E,
        config: ServerConfig,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            registry,
            sender,
            source: SourceHandle::new(source),
            encoder,
            config,
            running,
            phase: StreamPhase::Idle,
            sequence: 0,
            stats: DeliveryStats::new(),
        }
    }

    /// Run the loop until the shutdown flag flips or the source dies
    ///
    /// Returns `Ok(())` on a clean shutdown. A capture failure is fatal to
    /// the session and surfaces as [`Error::Capture`]; the source is
    /// released on every exit path.
    pub async fn run(mut self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.running.load(Ordering::SeqCst) {
            if self.registry.is_empty().await {
                if self.phase == StreamPhase::Streaming {
                    self.phase = StreamPhase::Idle;
                    self.source.release();
                    tracing::info!("No clients registered, stream idle");
                }
                tokio::time::sleep(self.config.idle_poll_interval).await;
                ticker.reset();
                continue;
            }

            if self.phase == StreamPhase::Idle {
                self.source.acquire().map_err(Error::Capture)?;
                self.phase = StreamPhase::Streaming;
                tracing::info!("Client(s) registered, streaming started");
            }

            ticker.tick().await;
            self.tick().await?;
        }

        self.source.release();
        tracing::info!(
            frames = self.stats.frames_sent,
            skipped = self.stats.frames_skipped,
            evicted = self.stats.clients_evicted,
            bitrate_bps = self.stats.bitrate_bps(),
            "Streaming loop stopped"
        );

        Ok(())
    }

    /// Current phase (for orchestration and tests)
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    async fn tick(&mut self) -> Result<()> {
        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Frame capture failed, stopping stream");
                return Err(Error::Capture(e));
            }
        };

        let encoded = match self.encoder.encode(&frame, self.config.encode_quality) {
            Ok(encoded) => encoded,
            Err(e) => {
                // The source is alive; drop this frame and keep going.
                tracing::warn!(error = %e, "Frame encode failed, skipping frame");
                self.stats.record_skipped();
                return Ok(());
            }
        };

        self.sequence = (self.sequence.wrapping_add(1)) % self.config.sequence_modulus;

        let frame_len = encoded.len();
        let fragments = fragment_frame(self.sequence, encoded, self.config.max_datagram_size)?;

        let recipients = self.registry.snapshot().await;
        let failed = self.sender.send_frame(&fragments, &recipients).await;

        for addr in &failed {
            self.registry.unregister(*addr).await;
        }

        // Count only recipients that accepted the whole frame; an evicted
        // recipient's fragments were abandoned partway.
        self.stats
            .record_frame(fragments.len(), frame_len, recipients.len() - failed.len());
        self.stats.record_evictions(failed.len());

        // Roughly once a second at the default frame rate
        if self.sequence % 30 == 1 {
            tracing::debug!(
                sequence = self.sequence,
                bytes = frame_len,
                fragments = fragments.len(),
                clients = recipients.len(),
                "Frame sent"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::net::SocketAddr;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::error::{EncodeError, SourceError};
    use crate::media::RawFrame;
    use crate::protocol::constants::HEADER_SIZE;
    use crate::protocol::fragment::FragmentHeader;

    #[derive(Default)]
    struct SourceProbe {
        captures: AtomicUsize,
        acquired: AtomicBool,
        fail_capture: AtomicBool,
    }

    struct StubSource {
        probe: Arc<SourceProbe>,
        frame_len: usize,
    }

    impl FrameSource for StubSource {
        fn acquire(&mut self) -> std::result::Result<(), SourceError> {
            self.probe.acquired.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn next_frame(&mut self) -> std::result::Result<RawFrame, SourceError> {
            if self.probe.fail_capture.load(Ordering::SeqCst) {
                return Err(SourceError::ReadFailed("device gone".into()));
            }
            self.probe.captures.fetch_add(1, Ordering::SeqCst);
            Ok(RawFrame {
                width: 4,
                height: 4,
                data: vec![0x55; self.frame_len].into(),
            })
        }

        fn release(&mut self) {
            self.probe.acquired.store(false, Ordering::SeqCst);
        }
    }

    /// Encoder that returns the raw bytes unchanged.
    struct IdentityEncoder;

    impl FrameEncoder for IdentityEncoder {
        fn encode(
            &self,
            frame: &RawFrame,
            _quality: u8,
        ) -> std::result::Result<Bytes, EncodeError> {
            Ok(frame.data.clone())
        }
    }

    #[derive(Default)]
    struct CollectingTransport {
        failing: HashSet<SocketAddr>,
        sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
    }

    impl CollectingTransport {
        fn datagrams_for(&self, addr: SocketAddr) -> Vec<Vec<u8>> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(a, _)| *a == addr)
                .map(|(_, d)| d.clone())
                .collect()
        }
    }

    #[async_trait]
    impl FragmentTransport for CollectingTransport {
        async fn send_to(&self, payload: &[u8], addr: SocketAddr) -> std::io::Result<usize> {
            if self.failing.contains(&addr) {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "injected failure",
                ));
            }
            self.sent.lock().unwrap().push((addr, payload.to_vec()));
            Ok(payload.len())
        }
    }

    struct Harness {
        registry: Arc<ClientRegistry>,
        transport: Arc<CollectingTransport>,
        probe: Arc<SourceProbe>,
        running: Arc<AtomicBool>,
        handle: tokio::task::JoinHandle<Result<()>>,
    }

    /// Fast-tick streamer on a collecting transport.
    fn start_streamer(
        frame_len: usize,
        config: ServerConfig,
        failing: HashSet<SocketAddr>,
    ) -> Harness {
        let registry = Arc::new(ClientRegistry::new());
        let transport = Arc::new(CollectingTransport {
            failing,
            sent: Mutex::new(Vec::new()),
        });
        let probe = Arc::new(SourceProbe::default());
        let running = Arc::new(AtomicBool::new(true));

        let streamer = Streamer::new(
            Arc::clone(&registry),
            FrameSender::new(Arc::clone(&transport), config.send_timeout),
            StubSource {
                probe: Arc::clone(&probe),
                frame_len,
            },
            IdentityEncoder,
            config,
            Arc::clone(&running),
        );

        let handle = tokio::spawn(streamer.run());

        Harness {
            registry,
            transport,
            probe,
            running,
            handle,
        }
    }

    fn fast_config() -> ServerConfig {
        ServerConfig::default()
            .frame_interval(Duration::from_millis(5))
            .idle_poll_interval(Duration::from_millis(5))
            .max_datagram_size(100)
    }

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    async fn stop(harness: Harness) -> Result<()> {
        harness.running.store(false, Ordering::SeqCst);
        harness.handle.await.unwrap()
    }

    #[tokio::test]
    async fn test_idle_loop_makes_no_captures() {
        let harness = start_streamer(100, fast_config(), HashSet::new());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(harness.probe.captures.load(Ordering::SeqCst), 0);
        assert!(!harness.probe.acquired.load(Ordering::SeqCst));

        stop(harness).await.unwrap();
    }

    #[tokio::test]
    async fn test_registered_client_receives_fragmented_frames() {
        let harness = start_streamer(250, fast_config(), HashSet::new());
        let client = addr(7100);

        harness.registry.register(client).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(harness.probe.captures.load(Ordering::SeqCst) > 0);
        assert!(harness.probe.acquired.load(Ordering::SeqCst));

        let datagrams = harness.transport.datagrams_for(client);
        assert!(!datagrams.is_empty());

        // 250-byte frames, 88-byte capacity: ceil(250/88) = 3 fragments
        let expected_total = 3u32;
        for datagram in &datagrams {
            assert!(datagram.len() <= 100);
            let header = FragmentHeader::parse(datagram).unwrap();
            assert_eq!(header.total, expected_total);
            assert!(header.index < expected_total);
            assert!(datagram.len() <= HEADER_SIZE + 88);
        }

        // First streamed frame carries sequence number 1
        let first = FragmentHeader::parse(&datagrams[0]).unwrap();
        assert_eq!(first.sequence, 1);

        stop(harness).await.unwrap();
    }

    #[tokio::test]
    async fn test_unregister_returns_loop_to_idle() {
        let harness = start_streamer(50, fast_config(), HashSet::new());
        let client = addr(7101);

        harness.registry.register(client).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(harness.probe.captures.load(Ordering::SeqCst) > 0);

        harness.registry.unregister(client).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Settled in idle: source closed, captures stopped
        assert!(!harness.probe.acquired.load(Ordering::SeqCst));
        let settled = harness.probe.captures.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(harness.probe.captures.load(Ordering::SeqCst), settled);

        stop(harness).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_recipient_is_evicted_others_keep_streaming() {
        let bad = addr(7102);
        let good = addr(7103);
        let harness = start_streamer(50, fast_config(), HashSet::from([bad]));

        harness.registry.register(good).await;
        harness.registry.register(bad).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let snapshot = harness.registry.snapshot().await;
        assert_eq!(snapshot, vec![good]);
        assert!(!harness.transport.datagrams_for(good).is_empty());
        assert!(harness.transport.datagrams_for(bad).is_empty());

        stop(harness).await.unwrap();
    }

    #[tokio::test]
    async fn test_stats_exclude_evicted_recipients() {
        let bad = addr(7106);
        let good = addr(7107);

        let registry = Arc::new(ClientRegistry::new());
        registry.register(good).await;
        registry.register(bad).await;

        let config = fast_config();
        let transport = Arc::new(CollectingTransport {
            failing: HashSet::from([bad]),
            sent: Mutex::new(Vec::new()),
        });
        let probe = Arc::new(SourceProbe::default());

        // 250-byte frames at 100-byte datagrams: 3 fragments per frame
        let mut streamer = Streamer::new(
            Arc::clone(&registry),
            FrameSender::new(transport, config.send_timeout),
            StubSource {
                probe,
                frame_len: 250,
            },
            IdentityEncoder,
            config,
            Arc::new(AtomicBool::new(true)),
        );

        streamer.tick().await.unwrap();

        // Only the surviving recipient counts toward delivery totals
        assert_eq!(streamer.stats.frames_sent, 1);
        assert_eq!(streamer.stats.fragments_sent, 3);
        assert_eq!(streamer.stats.bytes_sent, 250);
        assert_eq!(streamer.stats.clients_evicted, 1);
        assert_eq!(registry.snapshot().await, vec![good]);
    }

    #[tokio::test]
    async fn test_sequence_wraps_at_modulus() {
        let config = fast_config()
            .frame_interval(Duration::from_millis(1))
            .sequence_modulus(4);
        let harness = start_streamer(10, config, HashSet::new());
        let client = addr(7104);

        harness.registry.register(client).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let sequences: Vec<u32> = harness
            .transport
            .datagrams_for(client)
            .iter()
            .map(|d| FragmentHeader::parse(d).unwrap().sequence)
            .collect();

        assert!(sequences.len() > 8, "expected enough frames to wrap");
        assert!(sequences.iter().all(|&s| s < 4));
        // Wrapped back around to 0 after 3
        let wrapped = sequences.windows(2).any(|w| w[0] == 3 && w[1] == 0);
        assert!(wrapped, "sequence never wrapped: {:?}", sequences);

        stop(harness).await.unwrap();
    }

    #[tokio::test]
    async fn test_capture_failure_is_fatal_and_releases_source() {
        let harness = start_streamer(50, fast_config(), HashSet::new());
        let client = addr(7105);

        harness.registry.register(client).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        harness.probe.fail_capture.store(true, Ordering::SeqCst);

        let result = tokio::time::timeout(Duration::from_secs(1), harness.handle)
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(result, Err(Error::Capture(_))));
        // Drop of the source handle released the device
        assert!(!harness.probe.acquired.load(Ordering::SeqCst));
    }
}
