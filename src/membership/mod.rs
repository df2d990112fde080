//! Cluster membership: authoritative silo set, hash ring projection, and
//! heartbeat-based eviction.

mod health;
mod silo;
mod store;

pub use health::{HealthMonitor, HealthSample, HealthWeights};
pub use silo::{SiloInfo, SiloStatus};
pub use store::{in_memory::InMemoryClusterStore, ClusterStore, DateTimeMarker, StoreChange, StoreError};

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::ring::{HashRing, RingNode};
use crate::util::{composite_key, SiloId};

const SILO_PREFIX: &str = "cluster/silo/";

/// Eviction policy applied by the membership health check loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Never evict silos based on heartbeat age.
    None,
    /// Evict a silo once `last_heartbeat` is older than the configured
    /// threshold.
    HeartbeatTimeout,
}

/// Membership-change notification emitted by [`ClusterMembership`].
#[derive(Debug, Clone)]
pub enum MembershipEvent {
    SiloJoined(SiloId),
    SiloLeft(SiloId),
}

/// Maintains the authoritative silo set in a shared [`ClusterStore`] and
/// projects it into a local [`HashRing`].
pub struct ClusterMembership {
    store: Arc<dyn ClusterStore>,
    ring: Arc<HashRing>,
    local: DashMap<SiloId, SiloInfo>,
    ttl: Duration,
    eviction_policy: EvictionPolicy,
    eviction_timeout: Duration,
    events: tokio::sync::broadcast::Sender<MembershipEvent>,
}

impl ClusterMembership {
    pub fn new(store: Arc<dyn ClusterStore>, ring: Arc<HashRing>, ttl: Duration) -> Self {
        let (events, _) = tokio::sync::broadcast::channel(256);
        Self {
            store,
            ring,
            local: DashMap::new(),
            ttl,
            eviction_policy: EvictionPolicy::HeartbeatTimeout,
            eviction_timeout: Duration::from_secs(30),
            events,
        }
    }

    pub fn with_eviction_policy(mut self, policy: EvictionPolicy, timeout: Duration) -> Self {
        self.eviction_policy = policy;
        self.eviction_timeout = timeout;
        self
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<MembershipEvent> {
        self.events.subscribe()
    }

    /// Register this silo: writes `cluster/silo/<id>` with TTL and inserts
    /// it into the hash ring.
    pub async fn register_silo(&self, mut info: SiloInfo) -> Result<(), StoreError> {
        info.status = SiloStatus::Active;
        info.last_heartbeat = Utc::now();
        let key = info.storage_key();
        let bytes = serde_json::to_vec(&info).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.store.put(&key, bytes, Some(self.ttl)).await?;

        let mut node = RingNode::new(info.silo_id);
        node = node.with_affinity(crate::ring::NodeAffinity {
            region: info.region.clone(),
            zone: info.zone.clone(),
            shard_group: info.shard_group.clone(),
        });
        self.ring.add_node(node);
        self.local.insert(info.silo_id, info.clone());
        let _ = self.events.send(MembershipEvent::SiloJoined(info.silo_id));
        info!(silo_id = %info.silo_id, "silo registered");
        Ok(())
    }

    /// Refresh this silo's TTL and `last_heartbeat`.
    pub async fn update_heartbeat(&self, silo_id: SiloId) -> Result<(), StoreError> {
        if let Some(mut entry) = self.local.get_mut(&silo_id) {
            entry.last_heartbeat = Utc::now();
            let key = entry.storage_key();
            let bytes = serde_json::to_vec(&*entry).map_err(|e| StoreError::Unavailable(e.to_string()))?;
            self.store.put(&key, bytes, Some(self.ttl)).await?;
        }
        Ok(())
    }

    pub async fn unregister_silo(&self, silo_id: SiloId) -> Result<(), StoreError> {
        let key = format!("{SILO_PREFIX}{silo_id}");
        self.store.delete(&key).await?;
        self.local.remove(&silo_id);
        self.ring.remove_node(silo_id);
        let _ = self.events.send(MembershipEvent::SiloLeft(silo_id));
        Ok(())
    }

    pub fn get_active_silos(&self) -> Vec<SiloInfo> {
        self.local
            .iter()
            .filter(|e| e.status == SiloStatus::Active)
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn get_silo(&self, silo_id: SiloId) -> Option<SiloInfo> {
        self.local.get(&silo_id).map(|e| e.value().clone())
    }

    /// Where the ring currently places this actor.
    pub fn get_actor_silo(&self, actor_type: &str, actor_id: &str) -> Option<SiloId> {
        self.ring.get_node(&composite_key(actor_type, actor_id))
    }

    /// Reconcile the local view (and hash ring) against the store: peers
    /// written by other processes join the ring, peers whose records are
    /// gone leave it. Drives `SiloJoined`/`SiloLeft` events for observers.
    pub async fn reconcile_once(&self) -> Result<(), StoreError> {
        let records = self.store.scan_prefix(SILO_PREFIX).await?;
        let mut seen = Vec::with_capacity(records.len());
        for (_key, bytes) in records {
            let Ok(info) = serde_json::from_slice::<SiloInfo>(&bytes) else {
                warn!("skipping unreadable silo record during reconcile");
                continue;
            };
            seen.push(info.silo_id);
            if !self.local.contains_key(&info.silo_id) {
                let node = RingNode::new(info.silo_id).with_affinity(crate::ring::NodeAffinity {
                    region: info.region.clone(),
                    zone: info.zone.clone(),
                    shard_group: info.shard_group.clone(),
                });
                self.ring.add_node(node);
                let joined = info.silo_id;
                self.local.insert(joined, info);
                let _ = self.events.send(MembershipEvent::SiloJoined(joined));
                info!(silo_id = %joined, "silo discovered via store");
            }
        }
        let vanished: Vec<SiloId> = self
            .local
            .iter()
            .map(|e| *e.key())
            .filter(|id| !seen.contains(id))
            .collect();
        for silo_id in vanished {
            self.local.remove(&silo_id);
            self.ring.remove_node(silo_id);
            let _ = self.events.send(MembershipEvent::SiloLeft(silo_id));
            info!(%silo_id, "silo record gone from store, removed from ring");
        }
        Ok(())
    }

    /// Start the membership loop for `local_silo`: heartbeat refresh,
    /// store reconcile, and the eviction scan, every `interval`. Send on
    /// the returned sender to stop it.
    pub fn start(
        self: Arc<Self>,
        local_silo: SiloId,
        interval: Duration,
    ) -> (tokio::task::JoinHandle<()>, tokio::sync::oneshot::Sender<()>) {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        if let Err(err) = self.update_heartbeat(local_silo).await {
                            warn!(error = %err, "heartbeat refresh failed");
                        }
                        if let Err(err) = self.reconcile_once().await {
                            warn!(error = %err, "membership reconcile failed");
                        }
                        self.run_eviction_scan().await;
                    }
                }
            }
        });
        (task, shutdown_tx)
    }

    /// One health-check pass: evict silos whose heartbeat has exceeded
    /// `eviction_timeout`, per the configured [`EvictionPolicy`]. Errors
    /// unregistering one silo do not abort the scan of the rest.
    pub async fn run_eviction_scan(&self) {
        if self.eviction_policy == EvictionPolicy::None {
            return;
        }
        let now = Utc::now();
        let stale: Vec<SiloId> = self
            .local
            .iter()
            .filter(|e| {
                now.signed_duration_since(e.last_heartbeat)
                    .to_std()
                    .map(|age| age > self.eviction_timeout)
                    .unwrap_or(false)
            })
            .map(|e| *e.key())
            .collect();
        for silo_id in stale {
            if let Err(err) = self.unregister_silo(silo_id).await {
                warn!(%silo_id, error = %err, "failed to evict stale silo");
            }
        }
    }
}
