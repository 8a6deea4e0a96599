//! # framecast
//!
//! UDP frame streaming: one producer, many subscribers.
//!
//! A [`StreamServer`] captures processed video frames from a
//! [`FrameSource`](media::FrameSource), encodes them through a
//! [`FrameEncoder`](media::FrameEncoder), fragments each encoded frame into
//! bounded datagrams, and fans them out to every registered subscriber.
//! Receivers subscribe with a plaintext `REGISTER` message and reassemble
//! fragments with a [`FrameAssembler`](protocol::FrameAssembler) (or use
//! the bundled [`StreamReceiver`]).
//!
//! ```text
//!  FrameSource ─► encode ─► fragment ─► ┌──────────────┐ ──► client A
//!    (1 per tick)                       │ send to every│ ──► client B
//!                                       │   snapshot   │ ──► client C
//!  REGISTER/UNREGISTER ─► ClientRegistry└──────────────┘
//! ```
//!
//! Delivery is best-effort over unreliable datagrams: whole frames may be
//! lost, but delivered frames are reassembled exactly. Recipients that fail
//! to accept sends are evicted; failures never propagate between clients.
//!
//! ## Server example
//!
//! ```no_run
//! use framecast::{ServerConfig, StreamServer};
//! # use framecast::media::{FrameEncoder, FrameSource, RawFrame};
//! # use framecast::error::{EncodeError, SourceError};
//! # struct Webcam;
//! # impl FrameSource for Webcam {
//! #     fn acquire(&mut self) -> Result<(), SourceError> { Ok(()) }
//! #     fn next_frame(&mut self) -> Result<RawFrame, SourceError> { unimplemented!() }
//! #     fn release(&mut self) {}
//! # }
//! # struct Jpeg;
//! # impl FrameEncoder for Jpeg {
//! #     fn encode(&self, _: &RawFrame, _: u8) -> Result<bytes::Bytes, EncodeError> { unimplemented!() }
//! # }
//!
//! # async fn example() -> framecast::error::Result<()> {
//! let config = ServerConfig::default();
//! let server = StreamServer::bind(config).await?;
//! server.run(Webcam, Jpeg).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod media;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use client::{ClientConfig, StreamReceiver};
pub use error::{Error, Result};
pub use protocol::{fragment_frame, Fragment, FrameAssembler};
pub use registry::ClientRegistry;
pub use server::{ServerConfig, StreamServer};
