//! Peer Directory
//!
//! Bounded, insertion-ordered set of enodes. The oldest entries are dropped
//! once the capacity is reached so a full directory always holds the most
//! recently announced peers.

use std::collections::VecDeque;
use tracing::debug;

use crate::types::PeerAddress;

/// Bounded FIFO of unique peer addresses
#[derive(Debug, Clone)]
pub struct PeerDirectory {
    entries: VecDeque<PeerAddress>,
    capacity: usize,
}

impl PeerDirectory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert a peer; returns false if it was already present
    ///
    /// A duplicate keeps its original position.
    pub fn insert(&mut self, peer: PeerAddress) -> bool {
        if self.entries.contains(&peer) {
            return false;
        }

        self.entries.push_back(peer);
        self.trim();
        true
    }

    /// Adopt `capacity` and drop whatever no longer fits
    pub fn trim_to(&mut self, capacity: usize) -> usize {
        self.capacity = capacity;
        self.trim()
    }

    /// Drop oldest entries until the capacity holds; returns how many were removed
    pub fn trim(&mut self) -> usize {
        let excess = self.entries.len().saturating_sub(self.capacity);
        for evicted in self.entries.drain(..excess) {
            debug!("Evicting enode {} due to capacity", evicted);
        }
        excess
    }

    /// Snapshot of the directory in insertion order
    pub fn list(&self) -> Vec<String> {
        self.entries.iter().map(|p| p.as_str().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
