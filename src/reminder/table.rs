//! Reminder table contract and in-memory implementation.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::ring::HashRing;
use crate::util::{composite_key, SiloId};

/// Persistent scheduled message targeting an actor. `period` is `None`
/// for a one-shot reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub actor_id: String,
    pub actor_type: String,
    pub name: String,
    pub period: Option<std::time::Duration>,
    pub next_fire_time: DateTime<Utc>,
    pub last_fired_at: Option<DateTime<Utc>>,
}

impl Reminder {
    pub fn key(&self) -> (String, String) {
        (self.actor_id.clone(), self.name.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("reminder {actor_id}/{name} not found")]
    NotFound { actor_id: String, name: String },
}

#[async_trait]
pub trait ReminderTable: Send + Sync {
    async fn register(&self, reminder: Reminder) -> Result<(), ReminderError>;
    async fn unregister(&self, actor_id: &str, name: &str) -> Result<(), ReminderError>;
    async fn get_reminders(&self, actor_id: &str) -> Vec<Reminder>;
    /// Reminders due at or before `now`. Filters by hash-ring ownership
    /// when `ring` is `Some`; returns all due reminders when `ring` is
    /// `None` (e.g. in tests).
    async fn get_due_reminders_for_silo(
        &self,
        silo_id: SiloId,
        now: DateTime<Utc>,
        ring: Option<&HashRing>,
    ) -> Vec<Reminder>;
    async fn update_fire_time(
        &self,
        actor_id: &str,
        name: &str,
        last_fired: DateTime<Utc>,
        next_fire: DateTime<Utc>,
    ) -> Result<(), ReminderError>;
}

/// In-memory reminder table, keyed by `(actorId, name)`.
#[derive(Default)]
pub struct InMemoryReminderTable {
    reminders: RwLock<HashMap<(String, String), Reminder>>,
}

impl InMemoryReminderTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ReminderTable for InMemoryReminderTable {
    async fn register(&self, reminder: Reminder) -> Result<(), ReminderError> {
        self.reminders.write().insert(reminder.key(), reminder);
        Ok(())
    }

    async fn unregister(&self, actor_id: &str, name: &str) -> Result<(), ReminderError> {
        self.reminders
            .write()
            .remove(&(actor_id.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| ReminderError::NotFound {
                actor_id: actor_id.to_string(),
                name: name.to_string(),
            })
    }

    async fn get_reminders(&self, actor_id: &str) -> Vec<Reminder> {
        self.reminders
            .read()
            .values()
            .filter(|r| r.actor_id == actor_id)
            .cloned()
            .collect()
    }

    async fn get_due_reminders_for_silo(
        &self,
        silo_id: SiloId,
        now: DateTime<Utc>,
        ring: Option<&HashRing>,
    ) -> Vec<Reminder> {
        self.reminders
            .read()
            .values()
            .filter(|r| r.next_fire_time <= now)
            .filter(|r| match ring {
                None => true,
                Some(ring) => {
                    let key = composite_key(&r.actor_type, &r.actor_id);
                    ring.get_node(&key) == Some(silo_id)
                }
            })
            .cloned()
            .collect()
    }

    async fn update_fire_time(
        &self,
        actor_id: &str,
        name: &str,
        last_fired: DateTime<Utc>,
        next_fire: DateTime<Utc>,
    ) -> Result<(), ReminderError> {
        let mut reminders = self.reminders.write();
        let reminder = reminders
            .get_mut(&(actor_id.to_string(), name.to_string()))
            .ok_or_else(|| ReminderError::NotFound {
                actor_id: actor_id.to_string(),
                name: name.to_string(),
            })?;
        reminder.last_fired_at = Some(last_fired);
        reminder.next_fire_time = next_fire;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder(actor_id: &str, name: &str, due: DateTime<Utc>) -> Reminder {
        Reminder {
            actor_id: actor_id.to_string(),
            actor_type: "Counter".to_string(),
            name: name.to_string(),
            period: None,
            next_fire_time: due,
            last_fired_at: None,
        }
    }

    #[tokio::test]
    async fn register_then_lookup_round_trips() {
        let table = InMemoryReminderTable::new();
        table.register(reminder("a1", "ping", Utc::now())).await.unwrap();
        let reminders = table.get_reminders("a1").await;
        assert_eq!(reminders.len(), 1);
    }

    #[tokio::test]
    async fn due_reminders_without_ring_returns_all_due() {
        let table = InMemoryReminderTable::new();
        let now = Utc::now();
        table
            .register(reminder("a1", "past", now - chrono::Duration::seconds(5)))
            .await
            .unwrap();
        table
            .register(reminder("a2", "future", now + chrono::Duration::seconds(60)))
            .await
            .unwrap();
        let due = table.get_due_reminders_for_silo(SiloId::new(), now, None).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].actor_id, "a1");
    }

    #[tokio::test]
    async fn update_fire_time_advances_schedule() {
        let table = InMemoryReminderTable::new();
        let now = Utc::now();
        table.register(reminder("a1", "ping", now)).await.unwrap();
        let next = now + chrono::Duration::seconds(30);
        table.update_fire_time("a1", "ping", now, next).await.unwrap();
        let reminders = table.get_reminders("a1").await;
        assert_eq!(reminders[0].next_fire_time, next);
    }

    #[tokio::test]
    async fn unregister_removes_reminder() {
        let table = InMemoryReminderTable::new();
        table.register(reminder("a1", "ping", Utc::now())).await.unwrap();
        table.unregister("a1", "ping").await.unwrap();
        assert!(table.get_reminders("a1").await.is_empty());
    }
}
