//! Idle deactivation service: periodic scan that evicts cold actors.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use tokio::time::interval;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::tracker::ActivityTracker;
use crate::util::ActorIdentity;

/// Decides whether one actor should be deactivated, given its current
/// metrics. Implementations must not block.
pub trait DeactivationPolicy: Send + Sync {
    fn should_deactivate(
        &self,
        id: &ActorIdentity,
        last_activity_time: DateTime<Utc>,
        queue_depth: u32,
        active_call_count: u32,
    ) -> bool;
}

/// Deactivate once an actor has been fully idle (no queue, no in-flight
/// call) for at least `timeout`.
pub struct IdleTimeoutDeactivationPolicy {
    timeout: Duration,
}

impl IdleTimeoutDeactivationPolicy {
    /// `timeout` must be positive.
    pub fn new(timeout: Duration) -> Self {
        assert!(timeout > Duration::ZERO, "idle timeout must be positive");
        Self { timeout }
    }
}

impl DeactivationPolicy for IdleTimeoutDeactivationPolicy {
    fn should_deactivate(
        &self,
        _id: &ActorIdentity,
        last_activity_time: DateTime<Utc>,
        queue_depth: u32,
        active_call_count: u32,
    ) -> bool {
        if queue_depth != 0 || active_call_count != 0 {
            return false;
        }
        let idle_for = Utc::now() - last_activity_time;
        idle_for
            .to_std()
            .map(|d| d >= self.timeout)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IdleDeactivationConfig {
    pub enabled: bool,
    pub idle_timeout: Duration,
    pub check_interval: Duration,
    /// Never evict past this floor of live actors.
    pub minimum_active_actors: usize,
}

impl Default for IdleDeactivationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            idle_timeout: Duration::from_secs(5 * 60),
            check_interval: Duration::from_secs(60),
            minimum_active_actors: 0,
        }
    }
}

/// Callback invoked for an actor the scan decided to deactivate. Returning
/// `Err` is logged but does not abort the scan of the remaining actors.
#[async_trait::async_trait]
pub trait DeactivationHandler: Send + Sync {
    async fn on_deactivate(&self, id: &ActorIdentity) -> Result<(), String>;
}

pub struct IdleDeactivationService {
    tracker: Arc<ActivityTracker>,
    policy: Arc<dyn DeactivationPolicy>,
    config: IdleDeactivationConfig,
}

impl IdleDeactivationService {
    pub fn new(
        tracker: Arc<ActivityTracker>,
        policy: Arc<dyn DeactivationPolicy>,
        config: IdleDeactivationConfig,
    ) -> Self {
        Self {
            tracker,
            policy,
            config,
        }
    }

    /// Run one scan over `active_actors`, deactivating the ones the policy
    /// flags, floor permitting. Returns the identities actually deactivated.
    pub async fn scan_once(
        &self,
        active_actors: &[ActorIdentity],
        handler: &dyn DeactivationHandler,
    ) -> Vec<ActorIdentity> {
        let mut deactivated = Vec::new();
        if !self.config.enabled {
            return deactivated;
        }
        let mut live_count = active_actors.len();
        for id in active_actors {
            if live_count <= self.config.minimum_active_actors {
                break;
            }
            let Some(metrics) = self.tracker.get_activity_metrics(id) else {
                continue;
            };
            let should = self.policy.should_deactivate(
                id,
                metrics.last_activity_time,
                metrics.queue_depth,
                metrics.active_call_count,
            );
            if !should {
                continue;
            }
            match handler.on_deactivate(id).await {
                Ok(()) => {
                    self.tracker.remove(id);
                    deactivated.push(id.clone());
                    live_count -= 1;
                    debug!(actor = %id, "deactivated idle actor");
                }
                Err(reason) => {
                    warn!(actor = %id, error = %reason, "deactivation failed, continuing scan");
                }
            }
        }
        deactivated
    }

    /// Spawn the periodic scan loop. Send on the returned sender to stop it.
    pub fn spawn<F>(
        self: Arc<Self>,
        list_active_actors: F,
        handler: Arc<dyn DeactivationHandler>,
    ) -> (tokio::task::JoinHandle<()>, tokio::sync::oneshot::Sender<()>)
    where
        F: Fn() -> Vec<ActorIdentity> + Send + Sync + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        let check_interval = self.config.check_interval;
        let task = tokio::spawn(async move {
            let mut ticker = interval(check_interval);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let actors = list_active_actors();
                        self.scan_once(&actors, handler.as_ref()).await;
                    }
                }
            }
        });
        (task, shutdown_tx)
    }
}
