//! Subscriber registry
//!
//! The registry is the only state shared between the two long-lived tasks:
//! the registration listener (writes) and the streaming loop (snapshots).
//!
//! ```text
//!                      Arc<ClientRegistry>
//!                 ┌───────────────────────────┐
//!                 │ clients: HashSet<SockAddr>│
//!                 └──────────┬────────────────┘
//!          register/unregister│        │snapshot
//!                             │        │
//!                 [Registration        [Streaming
//!                  Listener]            Loop] ──► send_frame() ──► UDP
//! ```
//!
//! Snapshot semantics: a send pass iterates a copy, so a client that
//! registers mid-frame starts receiving with the next frame.

pub mod store;

pub use store::ClientRegistry;
