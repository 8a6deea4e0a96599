//! Frame source and encoder seams
//!
//! Capture devices and codecs are external collaborators. The streaming
//! loop only needs two operations: produce one processed image per tick,
//! and compress it into a byte payload. Both are modeled as traits so the
//! loop can be driven by a webcam wrapper in production and by
//! deterministic stubs in tests.

use bytes::Bytes;

use crate::error::{EncodeError, SourceError};

/// One fully-processed image from the frame source
///
/// The pixel format is opaque to this crate; the encoder that consumes the
/// frame defines it.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel data
    pub data: Bytes,
}

/// Producer of one processed image per capture tick
///
/// The device is held open only while at least one client is subscribed:
/// the streaming loop calls [`acquire`](FrameSource::acquire) when it
/// leaves the idle phase and [`release`](FrameSource::release) when it
/// returns to it.
pub trait FrameSource: Send {
    /// Open the underlying device
    fn acquire(&mut self) -> Result<(), SourceError>;

    /// Capture the next frame; only called between acquire and release
    fn next_frame(&mut self) -> Result<RawFrame, SourceError>;

    /// Close the underlying device
    fn release(&mut self);
}

/// Compresses a raw image into the byte payload that goes on the wire
pub trait FrameEncoder: Send {
    /// Encode a frame at the given quality setting (codec-defined scale)
    fn encode(&self, frame: &RawFrame, quality: u8) -> Result<Bytes, EncodeError>;
}

/// Ownership wrapper enforcing the acquire/release lifecycle
///
/// Tracks whether the device is currently open so acquire and release are
/// both idempotent, and releases on drop so the device is closed on every
/// exit path of the streaming loop.
#[derive(Debug)]
pub struct SourceHandle<S: FrameSource> {
    source: S,
    acquired: bool,
}

impl<S: FrameSource> SourceHandle<S> {
    /// Wrap a source; the device starts closed
    pub fn new(source: S) -> Self {
        Self {
            source,
            acquired: false,
        }
    }

    /// Open the device if it isn't already open
    pub fn acquire(&mut self) -> Result<(), SourceError> {
        if !self.acquired {
            self.source.acquire()?;
            self.acquired = true;
            tracing::debug!("Frame source acquired");
        }
        Ok(())
    }

    /// Close the device if it is open
    pub fn release(&mut self) {
        if self.acquired {
            self.source.release();
            self.acquired = false;
            tracing::debug!("Frame source released");
        }
    }

    /// Capture the next frame
    pub fn next_frame(&mut self) -> Result<RawFrame, SourceError> {
        self.source.next_frame()
    }

    /// Whether the device is currently open
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }
}

impl<S: FrameSource> Drop for SourceHandle<S> {
    fn drop(&mut self) {
        self.release();
    }
}
