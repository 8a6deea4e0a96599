//! Client registry implementation
//!
//! Tracks the set of currently subscribed receiver addresses. Pure data
//! structure: the registration listener mutates it while the streaming loop
//! takes snapshots, so every operation goes through a single `RwLock`.

use std::collections::HashSet;
use std::net::SocketAddr;

use tokio::sync::RwLock;

/// Live set of subscribed receiver addresses
///
/// All operations are total: registering a present address and
/// unregistering an absent one are no-ops. Iteration for sending always
/// goes through [`snapshot`](ClientRegistry::snapshot), so mutations during
/// a send pass only affect the next pass. The lock is never held across a
/// network call.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashSet<SocketAddr>>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber address
    ///
    /// Returns `true` if the address was newly added, `false` if it was
    /// already registered. The caller uses the distinction only for
    /// logging; a confirmation reply is sent either way.
    pub async fn register(&self, addr: SocketAddr) -> bool {
        let mut clients = self.clients.write().await;
        let added = clients.insert(addr);

        if added {
            tracing::info!(client = %addr, total = clients.len(), "Client registered");
        }

        added
    }

    /// Remove a subscriber address
    ///
    /// Returns `true` if the address was present.
    pub async fn unregister(&self, addr: SocketAddr) -> bool {
        let mut clients = self.clients.write().await;
        let removed = clients.remove(&addr);

        if removed {
            tracing::info!(client = %addr, total = clients.len(), "Client unregistered");
        }

        removed
    }

    /// Point-in-time copy of the current membership
    ///
    /// Safe to iterate while the registry mutates concurrently.
    pub async fn snapshot(&self) -> Vec<SocketAddr> {
        self.clients.read().await.iter().copied().collect()
    }

    /// Current subscriber count
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Whether the registry has no subscribers
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Empty the registry, returning the former members
    ///
    /// Used at shutdown to notify every subscriber exactly once.
    pub async fn drain(&self) -> Vec<SocketAddr> {
        let mut clients = self.clients.write().await;
        clients.drain().collect()
    }
}
