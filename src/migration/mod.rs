//! Migration coordinator: drain → transfer → activate.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::timeout;
use tracing::{error, info};

// Layer 3: Internal module imports
use crate::directory::ActorDirectory;
use crate::mailbox::Mailbox;
use crate::reminder::ReminderTable;
use crate::util::{ActorIdentity, SiloId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    Idle,
    InProgress,
    Completed,
    Failed { error_message: String },
}

/// The state-transfer side channel the migration coordinator drives.
/// Implemented over whatever transport the silo uses; kept as a narrow
/// trait so the coordinator stays transport-agnostic.
#[async_trait]
pub trait StateTransfer: Send + Sync {
    async fn snapshot(&self, actor: &ActorIdentity) -> Result<Vec<u8>, String>;
    async fn transfer_state(
        &self,
        actor: &ActorIdentity,
        target: SiloId,
        state: Vec<u8>,
    ) -> Result<(), String>;
    async fn activate_on_target(&self, actor: &ActorIdentity, target: SiloId) -> Result<(), String>;
    async fn deactivate_locally(&self, actor: &ActorIdentity) -> Result<(), String>;
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("already being migrated")]
    AlreadyMigrating,
    #[error("drain did not complete within timeout")]
    DrainTimeout,
    #[error("migration step failed: {0}")]
    StepFailed(String),
}

/// Drives the per-actor `Idle -> InProgress -> (Completed | Failed)` state
/// machine with at most one active migration per actor: a second
/// concurrent request for the same identity fails with
/// [`MigrationError::AlreadyMigrating`].
pub struct MigrationCoordinator {
    states: DashMap<ActorIdentity, MigrationState>,
    active_count: AtomicI64,
}

impl Default for MigrationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationCoordinator {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
            active_count: AtomicI64::new(0),
        }
    }

    pub fn state_of(&self, actor: &ActorIdentity) -> MigrationState {
        self.states
            .get(actor)
            .map(|s| s.value().clone())
            .unwrap_or(MigrationState::Idle)
    }

    pub fn active_migration_count(&self) -> i64 {
        self.active_count.load(Ordering::Acquire)
    }

    fn claim(&self, actor: &ActorIdentity) -> Result<(), MigrationError> {
        let mut claimed = false;
        self.states
            .entry(actor.clone())
            .and_modify(|s| {
                if !matches!(s, MigrationState::InProgress) {
                    *s = MigrationState::InProgress;
                    claimed = true;
                }
            })
            .or_insert_with(|| {
                claimed = true;
                MigrationState::InProgress
            });
        if claimed {
            self.active_count.fetch_add(1, Ordering::AcqRel);
            Ok(())
        } else {
            Err(MigrationError::AlreadyMigrating)
        }
    }

    fn finish(&self, actor: &ActorIdentity, state: MigrationState) {
        self.states.insert(actor.clone(), state);
        self.active_count.fetch_sub(1, Ordering::AcqRel);
    }

    /// Run the full migration for one actor. `source`/`target` are the
    /// current and destination silos; `mailbox` is the source activation's
    /// mailbox; `drain_timeout` bounds step 2. Any step failure leaves the
    /// source activation intact and rolls the directory entry back to
    /// `source`.
    #[allow(clippy::too_many_arguments)]
    pub async fn migrate_actor(
        &self,
        actor: ActorIdentity,
        source: SiloId,
        target: SiloId,
        mailbox: Arc<Mailbox>,
        transfer: &dyn StateTransfer,
        directory: &ActorDirectory,
        reminders: &dyn ReminderTable,
        drain_timeout: Duration,
    ) -> Result<(), MigrationError> {
        self.claim(&actor)?;
        info!(actor = %actor, target = %target, "migration started");

        let result = self
            .run_steps(&actor, target, mailbox, transfer, directory, reminders, drain_timeout)
            .await;

        match &result {
            Ok(()) => {
                self.finish(&actor, MigrationState::Completed);
                info!(actor = %actor, target = %target, "migration completed");
            }
            Err(e) => {
                self.finish(&actor, MigrationState::Failed { error_message: e.to_string() });
                error!(actor = %actor, target = %target, error = %e, "migration failed");
                // Roll back any partial directory write so lookups keep
                // resolving to the still-intact source activation.
                let _ = directory.register(&actor.actor_type, &actor.actor_id, source).await;
            }
        }
        result
    }

    async fn run_steps(
        &self,
        actor: &ActorIdentity,
        target: SiloId,
        mailbox: Arc<Mailbox>,
        transfer: &dyn StateTransfer,
        directory: &ActorDirectory,
        reminders: &dyn ReminderTable,
        drain_timeout: Duration,
    ) -> Result<(), MigrationError> {
        // Step 1: begin drain. No new posts accepted, in-flight drains.
        mailbox.begin_drain();

        // Step 2: wait for drain completion or timeout.
        let drained = timeout(drain_timeout, async {
            loop {
                if mailbox.message_count().await == 0 && mailbox.active_call_count_hint().await == 0 {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .is_ok();
        if !drained {
            return Err(MigrationError::DrainTimeout);
        }

        // Step 3: snapshot state.
        let state = transfer
            .snapshot(actor)
            .await
            .map_err(MigrationError::StepFailed)?;

        // Step 4: transfer to target.
        transfer
            .transfer_state(actor, target, state)
            .await
            .map_err(MigrationError::StepFailed)?;

        // Step 5: activate on target.
        transfer
            .activate_on_target(actor, target)
            .await
            .map_err(MigrationError::StepFailed)?;

        // Step 6: relocate reminders against the new owner.
        for reminder in reminders.get_reminders(&actor.actor_id).await {
            let _ = reminders
                .update_fire_time(
                    &reminder.actor_id,
                    &reminder.name,
                    reminder.last_fired_at.unwrap_or(reminder.next_fire_time),
                    reminder.next_fire_time,
                )
                .await;
        }

        // Step 7: update directory to point at target.
        directory
            .register(&actor.actor_type, &actor.actor_id, target)
            .await
            .map_err(|e: crate::membership::StoreError| MigrationError::StepFailed(e.to_string()))?;

        // Step 8: deactivate locally.
        transfer
            .deactivate_locally(actor)
            .await
            .map_err(MigrationError::StepFailed)?;
        mailbox.stop();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{ClusterStore, InMemoryClusterStore};
    use crate::reminder::InMemoryReminderTable;
    use std::sync::atomic::AtomicU32;

    struct AlwaysSucceeds;

    #[async_trait]
    impl StateTransfer for AlwaysSucceeds {
        async fn snapshot(&self, _actor: &ActorIdentity) -> Result<Vec<u8>, String> {
            Ok(vec![1, 2, 3])
        }
        async fn transfer_state(&self, _actor: &ActorIdentity, _target: SiloId, _state: Vec<u8>) -> Result<(), String> {
            Ok(())
        }
        async fn activate_on_target(&self, _actor: &ActorIdentity, _target: SiloId) -> Result<(), String> {
            Ok(())
        }
        async fn deactivate_locally(&self, _actor: &ActorIdentity) -> Result<(), String> {
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl StateTransfer for AlwaysFails {
        async fn snapshot(&self, _actor: &ActorIdentity) -> Result<Vec<u8>, String> {
            Err("snapshot failed".to_string())
        }
        async fn transfer_state(&self, _actor: &ActorIdentity, _target: SiloId, _state: Vec<u8>) -> Result<(), String> {
            Ok(())
        }
        async fn activate_on_target(&self, _actor: &ActorIdentity, _target: SiloId) -> Result<(), String> {
            Ok(())
        }
        async fn deactivate_locally(&self, _actor: &ActorIdentity) -> Result<(), String> {
            Ok(())
        }
    }

    fn directory() -> ActorDirectory {
        let store: Arc<dyn ClusterStore> = Arc::new(InMemoryClusterStore::new());
        ActorDirectory::new(store, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn successful_migration_updates_directory_and_stops_mailbox() {
        let coordinator = MigrationCoordinator::new();
        let actor = ActorIdentity::new("Counter", "a1");
        let source = SiloId::new();
        let target = SiloId::new();
        let mailbox = Arc::new(Mailbox::new("a1", 10));
        let directory = directory();
        let reminders = InMemoryReminderTable::new();

        let result = coordinator
            .migrate_actor(
                actor.clone(),
                source,
                target,
                mailbox,
                &AlwaysSucceeds,
                &directory,
                reminders.as_ref(),
                Duration::from_secs(1),
            )
            .await;
        assert!(result.is_ok());
        assert_eq!(coordinator.state_of(&actor), MigrationState::Completed);
        assert_eq!(coordinator.active_migration_count(), 0);
        let location = directory.lookup("Counter", "a1").await.unwrap().unwrap();
        assert_eq!(location.silo_id, target);
    }

    #[tokio::test]
    async fn failed_step_leaves_source_intact_and_records_failure() {
        let coordinator = MigrationCoordinator::new();
        let actor = ActorIdentity::new("Counter", "a1");
        let source = SiloId::new();
        let mailbox = Arc::new(Mailbox::new("a1", 10));
        let directory = directory();
        let reminders = InMemoryReminderTable::new();
        directory.register("Counter", "a1", source).await.unwrap();

        let result = coordinator
            .migrate_actor(
                actor.clone(),
                source,
                SiloId::new(),
                mailbox,
                &AlwaysFails,
                &directory,
                reminders.as_ref(),
                Duration::from_secs(1),
            )
            .await;
        assert!(result.is_err());
        assert!(matches!(coordinator.state_of(&actor), MigrationState::Failed { .. }));
        assert_eq!(coordinator.active_migration_count(), 0);
        let location = directory.lookup("Counter", "a1").await.unwrap().unwrap();
        assert_eq!(location.silo_id, source, "directory must roll back to source on failure");
    }

    #[tokio::test]
    async fn concurrent_migrations_are_mutually_exclusive() {
        let coordinator = Arc::new(MigrationCoordinator::new());
        let actor = ActorIdentity::new("Counter", "a1");
        let succeeded = Arc::new(AtomicU32::new(0));
        let failed = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let coordinator = coordinator.clone();
            let actor = actor.clone();
            let succeeded = succeeded.clone();
            let failed = failed.clone();
            handles.push(tokio::spawn(async move {
                let mailbox = Arc::new(Mailbox::new("a1", 10));
                let store: Arc<dyn ClusterStore> = Arc::new(InMemoryClusterStore::new());
                let directory = ActorDirectory::new(store, Duration::from_secs(60));
                let reminders = InMemoryReminderTable::new();
                let result = coordinator
                    .migrate_actor(
                        actor,
                        SiloId::new(),
                        SiloId::new(),
                        mailbox,
                        &AlwaysSucceeds,
                        &directory,
                        reminders.as_ref(),
                        Duration::from_secs(1),
                    )
                    .await;
                match result {
                    Ok(()) => {
                        succeeded.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(MigrationError::AlreadyMigrating) => {
                        failed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(succeeded.load(Ordering::SeqCst), 1);
        assert_eq!(failed.load(Ordering::SeqCst), 1);
    }
}
