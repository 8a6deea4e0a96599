//! Frame fragmentation and reassembly
//!
//! An encoded frame rarely fits in one datagram, so it is split into
//! bounded-size fragments, each prefixed with a 12-byte header:
//!
//! ```text
//! [0..4]   sequence_number   u32 BE  identifies the frame
//! [4..8]   total_fragments   u32 BE  fragment count for this frame
//! [8..12]  fragment_index    u32 BE  0-based position within the frame
//! [12..]   payload           [u8]    contiguous slice of the frame bytes
//! ```
//!
//! Concatenating the payloads of fragments `0..total_fragments` in index
//! order reproduces the encoded frame exactly. A zero-length frame still
//! produces one fragment with an empty payload, so receivers can observe
//! every sequence number.
//!
//! Fragmentation is a pure function; the [`FrameAssembler`] on the
//! receiving side buffers fragments for the most recent sequence number and
//! completes a frame once every index has arrived. Tracking only the latest
//! sequence keeps reassembly correct across the sequence wrap.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::protocol::constants::{HEADER_SIZE, MAX_FRAGMENTS_PER_FRAME, MIN_DATAGRAM_SIZE};

/// Fragment header: three big-endian u32 fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    /// Frame this fragment belongs to
    pub sequence: u32,
    /// Total number of fragments in the frame
    pub total: u32,
    /// 0-based index of this fragment
    pub index: u32,
}

impl FragmentHeader {
    /// Parse a header from the front of a datagram
    pub fn parse(datagram: &[u8]) -> Result<Self, ProtocolError> {
        if datagram.len() < HEADER_SIZE {
            return Err(ProtocolError::ShortHeader {
                len: datagram.len(),
            });
        }

        let mut buf = &datagram[..HEADER_SIZE];
        Ok(Self {
            sequence: buf.get_u32(),
            total: buf.get_u32(),
            index: buf.get_u32(),
        })
    }

    /// Write the header into a buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.sequence);
        buf.put_u32(self.total);
        buf.put_u32(self.index);
    }
}

/// One bounded-size piece of an encoded frame
///
/// Cheap to clone: the payload is a reference-counted slice of the frame.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Reassembly metadata
    pub header: FragmentHeader,
    /// Contiguous slice of the encoded frame (zero-copy)
    pub payload: Bytes,
}

impl Fragment {
    /// Assemble the on-wire datagram (header followed by payload)
    pub fn datagram(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        self.header.encode(&mut buf);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Split a received datagram into header and payload
    pub fn from_datagram(datagram: Bytes) -> Result<Self, ProtocolError> {
        let header = FragmentHeader::parse(&datagram)?;
        Ok(Self {
            header,
            payload: datagram.slice(HEADER_SIZE..),
        })
    }
}

/// Split an encoded frame into fragments, each fitting in `max_datagram_size`
///
/// Pure and deterministic. Payload capacity per fragment is
/// `max_datagram_size - HEADER_SIZE`; the fragment count is
/// `ceil(frame_len / capacity)` with a minimum of one, so an empty frame
/// yields a single fragment with an empty payload.
pub fn fragment_frame(
    sequence: u32,
    frame: Bytes,
    max_datagram_size: usize,
) -> Result<Vec<Fragment>, ProtocolError> {
    if max_datagram_size < MIN_DATAGRAM_SIZE {
        return Err(ProtocolError::DatagramSizeTooSmall {
            size: max_datagram_size,
            min: MIN_DATAGRAM_SIZE,
        });
    }

    let capacity = max_datagram_size - HEADER_SIZE;
    let total = frame.len().div_ceil(capacity).max(1) as u32;
    if total > MAX_FRAGMENTS_PER_FRAME {
        return Err(ProtocolError::FragmentCountTooLarge {
            total,
            max: MAX_FRAGMENTS_PER_FRAME,
        });
    }

    let mut fragments = Vec::with_capacity(total as usize);
    for index in 0..total {
        let start = index as usize * capacity;
        let end = (start + capacity).min(frame.len());

        fragments.push(Fragment {
            header: FragmentHeader {
                sequence,
                total,
                index,
            },
            payload: frame.slice(start..end),
        });
    }

    Ok(fragments)
}

/// Receiver-side reassembly buffer
///
/// Buffers fragments for the most recent sequence number only. A fragment
/// with a different sequence discards any incomplete frame and starts a new
/// one: frames of a live stream are disposable, and this keeps the
/// assembler correct when the sequence number wraps.
///
/// The reassembly buffer is sized from the header's total count, which
/// arrives over the network, so counts above
/// [`MAX_FRAGMENTS_PER_FRAME`] are rejected before anything is allocated.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    /// Sequence currently being assembled
    sequence: Option<u32>,
    /// Expected fragment count for the current frame
    total: u32,
    /// Payloads received so far, by index
    slots: Vec<Option<Bytes>>,
    /// Number of distinct indices received
    received: u32,
}

impl FrameAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment
    ///
    /// Returns the reassembled frame once the final fragment of the current
    /// sequence arrives, `None` while the frame is incomplete or the
    /// fragment is a duplicate. Fragments whose total count disagrees with
    /// the frame being assembled, exceeds the per-frame limit, or whose
    /// index is out of range, are rejected.
    pub fn push(&mut self, fragment: Fragment) -> Result<Option<Bytes>, ProtocolError> {
        let header = fragment.header;

        if header.total == 0 || header.index >= header.total {
            return Err(ProtocolError::IndexOutOfRange {
                index: header.index,
                total: header.total,
            });
        }
        if header.total > MAX_FRAGMENTS_PER_FRAME {
            return Err(ProtocolError::FragmentCountTooLarge {
                total: header.total,
                max: MAX_FRAGMENTS_PER_FRAME,
            });
        }

        // New frame: drop whatever was in flight and start over.
        if self.sequence != Some(header.sequence) {
            self.start_frame(header.sequence, header.total);
        } else if self.total != header.total {
            return Err(ProtocolError::FragmentCountMismatch {
                sequence: header.sequence,
                expected: self.total,
                got: header.total,
            });
        }

        let slot = &mut self.slots[header.index as usize];
        if slot.is_none() {
            *slot = Some(fragment.payload);
            self.received += 1;
        }

        if self.received == self.total {
            Ok(Some(self.take_frame()))
        } else {
            Ok(None)
        }
    }

    /// Sequence number of the frame currently being assembled
    pub fn current_sequence(&self) -> Option<u32> {
        self.sequence
    }

    fn start_frame(&mut self, sequence: u32, total: u32) {
        self.sequence = Some(sequence);
        self.total = total;
        self.slots.clear();
        self.slots.resize(total as usize, None);
        self.received = 0;
    }

    fn take_frame(&mut self) -> Bytes {
        let size: usize = self
            .slots
            .iter()
            .map(|s| s.as_ref().map_or(0, |b| b.len()))
            .sum();

        let mut frame = BytesMut::with_capacity(size);
        for slot in self.slots.drain(..) {
            if let Some(payload) = slot {
                frame.put_slice(&payload);
            }
        }

        self.sequence = None;
        self.total = 0;
        self.received = 0;

        frame.freeze()
    }
}
