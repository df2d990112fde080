#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

//! Benchmarks for the consistent hash ring.
//!
//! Measures the read path (key lookup against a populated ring, the hot
//! path of routing and reminder ownership) and the write path (membership
//! change forcing a vnode rebuild).

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use quark_rt::ring::{HashRing, HierarchicalHashRing, NodeAffinity, PlacementPreference, RingNode};
use quark_rt::util::SiloId;

fn populated_ring(silos: usize) -> HashRing {
    let ring = HashRing::new();
    for _ in 0..silos {
        ring.add_node(RingNode::new(SiloId::new()));
    }
    ring
}

fn benchmark_get_node(c: &mut Criterion) {
    let ring = populated_ring(3);
    c.bench_function("ring_get_node_3_silos", |b| {
        b.iter(|| ring.get_node(black_box("ICounter/actor-12345")));
    });

    let large = populated_ring(50);
    c.bench_function("ring_get_node_50_silos", |b| {
        b.iter(|| large.get_node(black_box("ICounter/actor-12345")));
    });
}

fn benchmark_add_node_rebuild(c: &mut Criterion) {
    c.bench_function("ring_add_node_rebuild", |b| {
        b.iter_batched(
            || (populated_ring(9), SiloId::new()),
            |(ring, newcomer)| ring.add_node(RingNode::new(newcomer)),
            BatchSize::SmallInput,
        );
    });
}

fn benchmark_hierarchical_lookup(c: &mut Criterion) {
    let ring = HierarchicalHashRing::new();
    for i in 0..6 {
        ring.add_node(RingNode::new(SiloId::new()).with_affinity(NodeAffinity {
            region: Some("us".to_string()),
            zone: Some(format!("us-{}", i % 2)),
            shard_group: None,
        }));
    }
    let preference = PlacementPreference {
        region: Some("us".to_string()),
        zone: Some("us-0".to_string()),
        shard_group: None,
    };
    c.bench_function("ring_hierarchical_zone_lookup", |b| {
        b.iter(|| ring.get_node(black_box("ICounter/actor-12345"), &preference));
    });
}

criterion_group!(
    benches,
    benchmark_get_node,
    benchmark_add_node_rebuild,
    benchmark_hierarchical_lookup,
);
criterion_main!(benches);
