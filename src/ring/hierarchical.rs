//! Hierarchical hash ring with region/zone/shard-group affinity.

use super::flat::{HashRing, RingNode};
use crate::util::SiloId;

/// Preference hints for a hierarchical lookup. Consulted in the order
/// shard group → zone → region → global
#[derive(Debug, Clone, Default)]
pub struct PlacementPreference {
    pub region: Option<String>,
    pub zone: Option<String>,
    pub shard_group: Option<String>,
}

/// Consistent hash ring that additionally maintains per-region, per-zone
/// and per-shard-group ring partitions for affinity-aware placement.
///
/// Each partition is itself a flat [`HashRing`] containing only the nodes
/// that belong to that partition, so lookups within a partition retain the
/// same determinism and distribution properties as the global ring.
#[derive(Default)]
pub struct HierarchicalHashRing {
    global: HashRing,
    by_region: dashmap::DashMap<String, HashRing>,
    by_zone: dashmap::DashMap<String, HashRing>,
    by_shard_group: dashmap::DashMap<String, HashRing>,
}

impl HierarchicalHashRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: RingNode) {
        if let Some(region) = node.affinity.region.clone() {
            self.by_region
                .entry(region)
                .or_default()
                .add_node(node.clone());
        }
        if let Some(zone) = node.affinity.zone.clone() {
            self.by_zone.entry(zone).or_default().add_node(node.clone());
        }
        if let Some(shard_group) = node.affinity.shard_group.clone() {
            self.by_shard_group
                .entry(shard_group)
                .or_default()
                .add_node(node.clone());
        }
        self.global.add_node(node);
    }

    pub fn remove_node(&self, silo_id: SiloId) {
        self.global.remove_node(silo_id);
        for mut entry in self.by_region.iter_mut() {
            entry.value_mut().remove_node(silo_id);
        }
        for mut entry in self.by_zone.iter_mut() {
            entry.value_mut().remove_node(silo_id);
        }
        for mut entry in self.by_shard_group.iter_mut() {
            entry.value_mut().remove_node(silo_id);
        }
    }

    pub fn node_count(&self) -> usize {
        self.global.node_count()
    }

    /// Affinity-aware lookup: shard group, then zone, then region, then
    /// the global ring. Falls through to the next tier whenever the
    /// preferred partition has no nodes (e.g. all silos in that zone are
    /// down) rather than returning `None`.
    pub fn get_node(&self, key: &str, preference: &PlacementPreference) -> Option<SiloId> {
        if let Some(shard_group) = preference.shard_group.as_deref().filter(|s| !s.is_empty()) {
            if let Some(ring) = self.by_shard_group.get(shard_group) {
                if let Some(owner) = ring.get_node(key) {
                    return Some(owner);
                }
            }
        }
        if let Some(zone) = preference.zone.as_deref() {
            if let Some(ring) = self.by_zone.get(zone) {
                if let Some(owner) = ring.get_node(key) {
                    return Some(owner);
                }
            }
        }
        if let Some(region) = preference.region.as_deref() {
            if let Some(ring) = self.by_region.get(region) {
                if let Some(owner) = ring.get_node(key) {
                    return Some(owner);
                }
            }
        }
        self.global.get_node(key)
    }

    pub fn get_nodes_in_region(&self, region: &str) -> Vec<SiloId> {
        self.global.get_nodes_in_region(region)
    }

    pub fn get_nodes_in_zone(&self, zone: &str) -> Vec<SiloId> {
        self.global.get_nodes_in_zone(zone)
    }

    pub fn get_nodes_in_shard_group(&self, shard_group: &str) -> Vec<SiloId> {
        self.global.get_nodes_in_shard_group(shard_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::flat::NodeAffinity;

    #[test]
    fn prefers_shard_group_over_zone_and_region() {
        let ring = HierarchicalHashRing::new();
        let shard_silo = SiloId::new();
        let other_silo = SiloId::new();

        ring.add_node(RingNode::new(shard_silo).with_affinity(NodeAffinity {
            region: Some("us".into()),
            zone: Some("us-east".into()),
            shard_group: Some("shard-1".into()),
        }));
        ring.add_node(RingNode::new(other_silo).with_affinity(NodeAffinity {
            region: Some("us".into()),
            zone: Some("us-east".into()),
            shard_group: None,
        }));

        let preference = PlacementPreference {
            region: Some("us".into()),
            zone: Some("us-east".into()),
            shard_group: Some("shard-1".into()),
        };
        for i in 0..20 {
            let owner = ring.get_node(&format!("actor-{i}"), &preference).unwrap();
            assert_eq!(owner, shard_silo);
        }
    }

    #[test]
    fn falls_back_to_global_when_no_preference() {
        let ring = HierarchicalHashRing::new();
        let silo = SiloId::new();
        ring.add_node(RingNode::new(silo));
        let owner = ring.get_node("actor-x", &PlacementPreference::default());
        assert_eq!(owner, Some(silo));
    }
}
