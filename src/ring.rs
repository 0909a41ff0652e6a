use std::collections::HashSet;

use sha2::{Digest, Sha256};

/// Default number of virtual positions a single server occupies on the ring.
pub const DEFAULT_VIRTUAL_NODES: usize = 150;

/// Consistent hash ring with virtual nodes.
///
/// Each server is placed at `virtual_nodes` positions; a key is owned by the
/// first position whose hash is greater than or equal to the key's hash,
/// wrapping around at the end of the ring. Adding or removing a server only
/// moves ownership of the keys in the arcs adjacent to that server's
/// positions.
///
/// The ring is a plain data structure; callers that share it across tasks
/// are responsible for synchronization.
#[derive(Debug, Clone)]
pub struct HashRing {
    virtual_nodes: usize,
    // Sorted by hash. The sort is stable, so equal hashes keep their
    // insertion order, which makes tie-breaking deterministic.
    positions: Vec<(u32, String)>,
    servers: HashSet<String>,
}

impl HashRing {
    /// Creates an empty ring. A `virtual_nodes` of 0 falls back to
    /// [`DEFAULT_VIRTUAL_NODES`].
    pub fn new(virtual_nodes: usize) -> Self {
        let virtual_nodes = if virtual_nodes == 0 {
            DEFAULT_VIRTUAL_NODES
        } else {
            virtual_nodes
        };

        Self {
            virtual_nodes,
            positions: Vec::new(),
            servers: HashSet::new(),
        }
    }

    /// Adds a server to the ring. Adding a server that is already present is
    /// a no-op.
    pub fn add(&mut self, server: &str) {
        if !self.servers.insert(server.to_string()) {
            return;
        }

        for i in 0..self.virtual_nodes {
            let hash = hash_position(&format!("{server}:{i}"));
            self.positions.push((hash, server.to_string()));
        }
        self.positions.sort_by_key(|(hash, _)| *hash);
    }

    /// Removes a server and all of its virtual positions. Removing an absent
    /// server is a no-op.
    pub fn remove(&mut self, server: &str) {
        if !self.servers.remove(server) {
            return;
        }
        self.positions.retain(|(_, owner)| owner != server);
    }

    /// Returns the server owning `key`, or `None` when the ring is empty.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        if self.positions.is_empty() {
            return None;
        }

        let hash = hash_position(key);
        let index = self.positions.partition_point(|(position, _)| *position < hash);
        let index = if index == self.positions.len() { 0 } else { index };

        Some(self.positions[index].1.as_str())
    }

    /// The set of servers currently on the ring, in no particular order.
    pub fn members(&self) -> Vec<&str> {
        self.servers.iter().map(String::as_str).collect()
    }

    /// Total number of virtual positions on the ring.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(DEFAULT_VIRTUAL_NODES)
    }
}

// Ring placement hash: the first 4 bytes of the SHA-256 digest, big-endian.
fn hash_position(input: &str) -> u32 {
    let digest = Sha256::digest(input.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}
