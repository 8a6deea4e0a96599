//! Media collaborator interfaces
//!
//! This module provides:
//! - The raw frame type handed from capture to encoding
//! - The `FrameSource` / `FrameEncoder` seams for external capture and codec
//! - A lifecycle guard that opens the device lazily and closes it on drop

pub mod source;

pub use source::{FrameEncoder, FrameSource, RawFrame, SourceHandle};
