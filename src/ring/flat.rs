//! Flat consistent hash ring.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use parking_lot::RwLock;

// Layer 3: Internal module imports
use crate::util::SiloId;

/// Default number of virtual nodes per silo
pub const DEFAULT_VIRTUAL_NODES: usize = 150;

/// Optional placement affinity attached to a ring node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeAffinity {
    pub region: Option<String>,
    pub zone: Option<String>,
    pub shard_group: Option<String>,
}

/// A silo participating in the hash ring.
#[derive(Debug, Clone)]
pub struct RingNode {
    pub silo_id: SiloId,
    pub affinity: NodeAffinity,
    pub virtual_node_count: usize,
}

impl RingNode {
    pub fn new(silo_id: SiloId) -> Self {
        Self {
            silo_id,
            affinity: NodeAffinity::default(),
            virtual_node_count: DEFAULT_VIRTUAL_NODES,
        }
    }

    pub fn with_affinity(mut self, affinity: NodeAffinity) -> Self {
        self.affinity = affinity;
        self
    }

    pub fn with_virtual_node_count(mut self, count: usize) -> Self {
        self.virtual_node_count = count;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct VirtualNode {
    hash: u32,
    silo_index: usize,
    vnode_index: usize,
}

/// Hash `"{silo_id}|{vnode_index}"` into 32-bit space via SIMD-accelerated
/// CRC32 (falls back to the portable software implementation when the
/// target lacks hardware CRC32 support; `crc32fast` picks this at
/// runtime).
fn hash_vnode(silo_id: &SiloId, vnode_index: usize) -> u32 {
    let key = format!("{silo_id}|{vnode_index}");
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(key.as_bytes());
    hasher.finalize()
}

fn hash_key(key: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(key.as_bytes());
    hasher.finalize()
}

struct RingState {
    nodes: Vec<RingNode>,
    vnodes: Vec<VirtualNode>,
}

impl RingState {
    fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            vnodes: Vec::new(),
        }
    }

    fn rebuild_vnodes(&mut self) {
        let mut vnodes = Vec::new();
        for (silo_index, node) in self.nodes.iter().enumerate() {
            for vnode_index in 0..node.virtual_node_count {
                vnodes.push(VirtualNode {
                    hash: hash_vnode(&node.silo_id, vnode_index),
                    silo_index,
                    vnode_index,
                });
            }
        }
        vnodes.sort_by(|a, b| {
            a.hash
                .cmp(&b.hash)
                .then_with(|| self.nodes[a.silo_index].silo_id.cmp_for_tiebreak(&self.nodes[b.silo_index].silo_id))
                .then_with(|| a.vnode_index.cmp(&b.vnode_index))
        });
        self.vnodes = vnodes;
    }

    fn lookup(&self, key: &str, predicate: impl Fn(&RingNode) -> bool) -> Option<SiloId> {
        if self.vnodes.is_empty() {
            return None;
        }
        let hash = hash_key(key);
        let start = self
            .vnodes
            .partition_point(|v| v.hash < hash);
        let len = self.vnodes.len();
        for offset in 0..len {
            let idx = (start + offset) % len;
            let vnode = &self.vnodes[idx];
            let node = &self.nodes[vnode.silo_index];
            if predicate(node) {
                return Some(node.silo_id);
            }
        }
        None
    }
}

// `SiloId` has no natural ordering; provide a stable tie-break via its
// UUID bytes without exposing `Ord` on the public type.
trait TieBreak {
    fn cmp_for_tiebreak(&self, other: &Self) -> std::cmp::Ordering;
}

impl TieBreak for SiloId {
    fn cmp_for_tiebreak(&self, other: &Self) -> std::cmp::Ordering {
        self.as_uuid().cmp(other.as_uuid())
    }
}

/// Consistent hash ring mapping composite keys to silos.
///
/// Lookups are the common path, writes (membership changes) are rare;
/// guarded by a `parking_lot::RwLock`.
pub struct HashRing {
    state: RwLock<RingState>,
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("HashRing")
            .field("nodes", &state.nodes.len())
            .field("vnodes", &state.vnodes.len())
            .finish()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

impl HashRing {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RingState::empty()),
        }
    }

    /// Add a node. Idempotent: adding a silo already present replaces its
    /// affinity/vnode configuration rather than duplicating it.
    pub fn add_node(&self, node: RingNode) {
        let mut state = self.state.write();
        if let Some(existing) = state.nodes.iter_mut().find(|n| n.silo_id == node.silo_id) {
            *existing = node;
        } else {
            state.nodes.push(node);
        }
        state.rebuild_vnodes();
    }

    /// Remove a node. No-op if the silo is not present.
    pub fn remove_node(&self, silo_id: SiloId) {
        let mut state = self.state.write();
        state.nodes.retain(|n| n.silo_id != silo_id);
        state.rebuild_vnodes();
    }

    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn contains(&self, silo_id: SiloId) -> bool {
        self.state.read().nodes.iter().any(|n| n.silo_id == silo_id)
    }

    /// Deterministic lookup: the first vnode at or after `hash(key)` in
    /// ring order, wrapping around. `None` iff the ring is empty.
    pub fn get_node(&self, key: &str) -> Option<SiloId> {
        self.state.read().lookup(key, |_| true)
    }

    pub fn get_nodes_in_region(&self, region: &str) -> Vec<SiloId> {
        let state = self.state.read();
        state
            .nodes
            .iter()
            .filter(|n| n.affinity.region.as_deref() == Some(region))
            .map(|n| n.silo_id)
            .collect()
    }

    pub fn get_nodes_in_zone(&self, zone: &str) -> Vec<SiloId> {
        let state = self.state.read();
        state
            .nodes
            .iter()
            .filter(|n| n.affinity.zone.as_deref() == Some(zone))
            .map(|n| n.silo_id)
            .collect()
    }

    pub fn get_nodes_in_shard_group(&self, shard_group: &str) -> Vec<SiloId> {
        let state = self.state.read();
        state
            .nodes
            .iter()
            .filter(|n| n.affinity.shard_group.as_deref() == Some(shard_group))
            .map(|n| n.silo_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with(n: usize) -> (HashRing, Vec<SiloId>) {
        let ring = HashRing::new();
        let ids: Vec<SiloId> = (0..n).map(|_| SiloId::new()).collect();
        for id in &ids {
            ring.add_node(RingNode::new(*id));
        }
        (ring, ids)
    }

    #[test]
    fn lookup_is_deterministic() {
        let (ring, _ids) = ring_with(3);
        let a = ring.get_node("actor-42");
        let b = ring.get_node("actor-42");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_ring_returns_none() {
        let ring = HashRing::new();
        assert_eq!(ring.get_node("anything"), None);
    }

    #[test]
    fn distribution_is_roughly_even() {
        let (ring, ids) = ring_with(3);
        let mut counts = std::collections::HashMap::new();
        for i in 0..3000 {
            let key = format!("actor-{i}");
            let owner = ring.get_node(&key).unwrap();
            *counts.entry(owner).or_insert(0u32) += 1;
        }
        for id in ids {
            let count = *counts.get(&id).unwrap_or(&0);
            assert!((600..=1650).contains(&count), "count {count} out of range");
        }
    }

    #[test]
    fn adding_node_causes_minimum_churn() {
        let (ring, _ids) = ring_with(2);
        let before: Vec<Option<SiloId>> = (0..100)
            .map(|i| ring.get_node(&format!("actor-{i}")))
            .collect();
        let new_node = SiloId::new();
        ring.add_node(RingNode::new(new_node));
        let after: Vec<Option<SiloId>> = (0..100)
            .map(|i| ring.get_node(&format!("actor-{i}")))
            .collect();
        let moved = before.iter().zip(after.iter()).filter(|(a, b)| a != b).count();
        assert!((20..=50).contains(&moved), "moved {moved} keys, expected 20..=50");
    }

    #[test]
    fn remove_node_is_idempotent() {
        let (ring, ids) = ring_with(1);
        ring.remove_node(ids[0]);
        ring.remove_node(ids[0]);
        assert_eq!(ring.node_count(), 0);
    }

    #[test]
    fn add_node_is_idempotent_on_duplicate() {
        let (ring, ids) = ring_with(1);
        ring.add_node(RingNode::new(ids[0]));
        assert_eq!(ring.node_count(), 1);
    }
}
