//! Frame stream subscriber demo
//!
//! Run with: cargo run --example watch_frames [SERVER_ADDR]
//!
//! Examples:
//!   cargo run --example watch_frames                    # 127.0.0.1:8888
//!   cargo run --example watch_frames 192.168.1.20:8888
//!
//! Registers with a running frame server (see the pattern_server demo),
//! then prints a line per second with the frame rate and bandwidth it is
//! observing until the server shuts down.

use std::time::{Duration, Instant};

use framecast::client::{ClientConfig, ReceiverEvent, StreamReceiver};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "framecast=info".into()),
        )
        .init();

    let server_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8888".to_string())
        .parse()?;

    let config = ClientConfig::new(server_addr);
    let (mut receiver, mut events) = StreamReceiver::new(config);

    let printer = tokio::spawn(async move {
        let mut frames = 0u64;
        let mut bytes = 0u64;
        let mut window = Instant::now();

        while let Some(event) = events.recv().await {
            match event {
                ReceiverEvent::Registered => println!("Registered with {}", server_addr),
                ReceiverEvent::Frame(frame) => {
                    frames += 1;
                    bytes += frame.len() as u64;

                    if window.elapsed() >= Duration::from_secs(1) {
                        println!(
                            "{} fps, {:.1} KiB/s",
                            frames,
                            bytes as f64 / 1024.0 / window.elapsed().as_secs_f64()
                        );
                        frames = 0;
                        bytes = 0;
                        window = Instant::now();
                    }
                }
                ReceiverEvent::ServerShutdown => {
                    println!("Server shut down");
                    break;
                }
            }
        }
    });

    receiver.connect().await?;
    receiver.run().await?;
    printer.await?;

    Ok(())
}
