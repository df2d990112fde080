//! Consistent hash ring for actor placement and reminder ownership.

mod flat;
mod hierarchical;

pub use flat::{HashRing, NodeAffinity, RingNode, DEFAULT_VIRTUAL_NODES};
pub use hierarchical::{HierarchicalHashRing, PlacementPreference};
