//! Smart router: classifies outbound calls as `SameProcess`/`LocalSilo`/
//! `Remote` with a short-TTL decision cache layered over the actor
//! directory and hash ring. Cached decisions are evicted on migration,
//! on directory change events, and on explicit directory errors.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use tokio::time::Instant;

// Layer 3: Internal module imports
use crate::directory::ActorDirectory;
use crate::membership::{ClusterStore, StoreChange, StoreError};
use crate::ring::HashRing;
use crate::util::{composite_key, ActorIdentity, SiloId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// The call targets an activation in this process.
    SameProcess,
    /// The call targets this silo but a different activation/process
    /// boundary (e.g. a distinct silo instance sharing this host).
    LocalSilo,
    /// The call must cross the network to another silo.
    Remote(SiloId),
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("directory lookup failed: {0}")]
    Directory(#[from] StoreError),
}

#[derive(Debug, Default)]
pub struct RouterMetrics {
    pub total_requests: AtomicU64,
    pub local_silo_hits: AtomicU64,
    pub remote_hits: AtomicU64,
    pub cache_hits: AtomicU64,
}

struct CacheEntry {
    decision: RouteDecision,
    cached_at: Instant,
}

pub struct SmartRouter {
    local_silo_id: SiloId,
    directory: Arc<ActorDirectory>,
    ring: Arc<HashRing>,
    cache: DashMap<ActorIdentity, CacheEntry>,
    cache_ttl: Duration,
    pub metrics: RouterMetrics,
}

impl SmartRouter {
    pub fn new(local_silo_id: SiloId, directory: Arc<ActorDirectory>, ring: Arc<HashRing>, cache_ttl: Duration) -> Self {
        Self {
            local_silo_id,
            directory,
            ring,
            cache: DashMap::new(),
            cache_ttl,
            metrics: RouterMetrics::default(),
        }
    }

    pub async fn route(&self, actor: &ActorIdentity) -> Result<RouteDecision, RouterError> {
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        if let Some(entry) = self.cache.get(actor) {
            if entry.cached_at.elapsed() < self.cache_ttl {
                self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
                self.record_hit(entry.decision);
                return Ok(entry.decision);
            }
        }

        let decision = self.resolve(actor).await?;
        self.cache.insert(
            actor.clone(),
            CacheEntry { decision, cached_at: Instant::now() },
        );
        self.record_hit(decision);
        Ok(decision)
    }

    async fn resolve(&self, actor: &ActorIdentity) -> Result<RouteDecision, RouterError> {
        if let Some(location) = self.directory.lookup(&actor.actor_type, &actor.actor_id).await? {
            return Ok(if location.silo_id == self.local_silo_id {
                RouteDecision::SameProcess
            } else {
                RouteDecision::Remote(location.silo_id)
            });
        }
        let key = composite_key(&actor.actor_type, &actor.actor_id);
        Ok(match self.ring.get_node(&key) {
            Some(owner) if owner == self.local_silo_id => RouteDecision::LocalSilo,
            Some(owner) => RouteDecision::Remote(owner),
            None => RouteDecision::LocalSilo,
        })
    }

    fn record_hit(&self, decision: RouteDecision) {
        match decision {
            RouteDecision::SameProcess | RouteDecision::LocalSilo => {
                self.metrics.local_silo_hits.fetch_add(1, Ordering::Relaxed);
            }
            RouteDecision::Remote(_) => {
                self.metrics.remote_hits.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Evicts a cached decision. Called on migration completion, directory
    /// change events, and explicit directory errors.
    pub fn invalidate(&self, actor: &ActorIdentity) {
        self.cache.remove(actor);
    }

    pub fn cached_entry_count(&self) -> usize {
        self.cache.len()
    }

    /// Watch the directory's change feed on the cluster store, evicting
    /// the cached decision for any actor whose location record changed.
    /// Poll-based fallback per the store contract; stores with native
    /// pub/sub surface changes through the same `poll_changes` seam.
    pub fn watch_directory(
        self: &Arc<Self>,
        store: Arc<dyn ClusterStore>,
        poll_interval: Duration,
    ) -> (tokio::task::JoinHandle<()>, tokio::sync::oneshot::Sender<()>) {
        const DIRECTORY_PREFIX: &str = "directory/";
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        let router = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut cursor = None;
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let Ok((changes, next)) = store.poll_changes(DIRECTORY_PREFIX, cursor).await else {
                            continue;
                        };
                        cursor = Some(next);
                        for change in changes {
                            let key = match &change {
                                StoreChange::Put { key, .. } | StoreChange::Delete { key } => key,
                            };
                            if let Some((actor_type, actor_id)) = key
                                .strip_prefix(DIRECTORY_PREFIX)
                                .and_then(|k| k.split_once('/'))
                            {
                                router.invalidate(&ActorIdentity::new(actor_type, actor_id));
                            }
                        }
                    }
                }
            }
        });
        (task, shutdown_tx)
    }
}
