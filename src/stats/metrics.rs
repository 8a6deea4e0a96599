//! Statistics for a streaming session

use std::time::{Duration, Instant};

/// Delivery counters for one streaming session
///
/// Owned by the streaming loop and logged periodically; all counting is
/// from the sender's perspective (delivery is best-effort, so "sent" means
/// handed to the transport).
#[derive(Debug, Clone)]
pub struct DeliveryStats {
    /// Frames fragmented and sent
    pub frames_sent: u64,
    /// Frames dropped because encoding failed
    pub frames_skipped: u64,
    /// Total fragments sent across all recipients
    pub fragments_sent: u64,
    /// Total payload bytes sent across all recipients
    pub bytes_sent: u64,
    /// Recipients evicted after send failures
    pub clients_evicted: u64,
    /// Session start time
    started_at: Instant,
}

impl DeliveryStats {
    /// Create a zeroed stats tracker starting now
    pub fn new() -> Self {
        Self {
            frames_sent: 0,
            frames_skipped: 0,
            fragments_sent: 0,
            bytes_sent: 0,
            clients_evicted: 0,
            started_at: Instant::now(),
        }
    }

    /// Record one frame sent to `recipients` clients
    pub fn record_frame(&mut self, fragments: usize, frame_bytes: usize, recipients: usize) {
        self.frames_sent += 1;
        self.fragments_sent += (fragments * recipients) as u64;
        self.bytes_sent += (frame_bytes * recipients) as u64;
    }

    /// Record a frame dropped due to an encode failure
    pub fn record_skipped(&mut self) {
        self.frames_skipped += 1;
    }

    /// Record recipients evicted after a send pass
    pub fn record_evictions(&mut self, count: usize) {
        self.clients_evicted += count as u64;
    }

    /// Session duration so far
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Average outbound bitrate (bits/sec) since the session started
    pub fn bitrate_bps(&self) -> u64 {
        let secs = self.elapsed().as_secs();
        if secs > 0 {
            (self.bytes_sent * 8) / secs
        } else {
            0
        }
    }
}

impl Default for DeliveryStats {
    fn default() -> Self {
        Self::new()
    }
}
