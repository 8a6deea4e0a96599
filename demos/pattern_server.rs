//! Frame server demo with a synthetic test-pattern source
//!
//! Run with: cargo run --example pattern_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example pattern_server                  # binds to 0.0.0.0:8888
//!   cargo run --example pattern_server 127.0.0.1:9000
//!
//! Subscribe with the companion demo:
//!   cargo run --example watch_frames 127.0.0.1:8888
//!
//! The source produces a moving gradient instead of a webcam frame, and the
//! encoder is a passthrough: real deployments plug in a capture device and
//! an image codec behind the same two traits.

use bytes::{BufMut, Bytes, BytesMut};

use framecast::error::{EncodeError, SourceError};
use framecast::media::{FrameEncoder, FrameSource, RawFrame};
use framecast::{ServerConfig, StreamServer};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

/// Generates a scrolling grayscale gradient, one frame per call
struct PatternSource {
    tick: u8,
    open: bool,
}

impl PatternSource {
    fn new() -> Self {
        Self {
            tick: 0,
            open: false,
        }
    }
}

impl FrameSource for PatternSource {
    fn acquire(&mut self) -> Result<(), SourceError> {
        println!("Pattern source opened");
        self.open = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RawFrame, SourceError> {
        if !self.open {
            return Err(SourceError::Unavailable("source not acquired".into()));
        }

        self.tick = self.tick.wrapping_add(1);
        let mut data = BytesMut::with_capacity((WIDTH * HEIGHT) as usize);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                data.put_u8((x as u8).wrapping_add(y as u8).wrapping_add(self.tick));
            }
        }

        Ok(RawFrame {
            width: WIDTH,
            height: HEIGHT,
            data: data.freeze(),
        })
    }

    fn release(&mut self) {
        println!("Pattern source closed");
        self.open = false;
    }
}

/// Ships the raw pixels unchanged; stands in for a JPEG encoder
struct PassthroughEncoder;

impl FrameEncoder for PassthroughEncoder {
    fn encode(&self, frame: &RawFrame, _quality: u8) -> Result<Bytes, EncodeError> {
        Ok(frame.data.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "framecast=debug".into()),
        )
        .init();

    let bind_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0.0.0.0:8888".to_string())
        .parse()?;

    let config = ServerConfig::with_addr(bind_addr);
    let server = StreamServer::bind(config).await?;

    println!("Streaming on {}, Ctrl+C to stop", server.local_addr()?);

    server
        .run_until(PatternSource::new(), PassthroughEncoder, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    println!("Server stopped");
    Ok(())
}
