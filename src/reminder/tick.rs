//! Reminder tick manager: one loop per silo, firing due reminders.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::Utc;
use tokio::time::interval;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::table::{Reminder, ReminderTable};
use crate::ring::HashRing;
use crate::util::SiloId;

/// Delivers a fired reminder to its target activation. Implemented by the
/// silo's request pump in production; a test double can simply record
/// calls.
#[async_trait::async_trait]
pub trait ReminderSink: Send + Sync {
    async fn fire(&self, reminder: &Reminder) -> Result<(), String>;
}

pub struct ReminderTickManager {
    table: Arc<dyn ReminderTable>,
    ring: Option<Arc<HashRing>>,
    silo_id: SiloId,
    tick_interval: Duration,
}

impl ReminderTickManager {
    pub fn new(
        table: Arc<dyn ReminderTable>,
        ring: Option<Arc<HashRing>>,
        silo_id: SiloId,
        tick_interval: Duration,
    ) -> Self {
        Self {
            table,
            ring,
            silo_id,
            tick_interval,
        }
    }

    /// Run one tick: fire every due reminder this silo owns, then advance
    /// or unregister it. A delivery failure is logged and the schedule
    /// still advances: at most once per tick.
    pub async fn tick_once(&self, sink: &dyn ReminderSink) {
        let now = Utc::now();
        let due = self
            .table
            .get_due_reminders_for_silo(self.silo_id, now, self.ring.as_deref())
            .await;
        for reminder in due {
            if let Err(reason) = sink.fire(&reminder).await {
                warn!(
                    actor = %reminder.actor_id,
                    reminder = %reminder.name,
                    error = %reason,
                    "reminder delivery failed, advancing schedule anyway"
                );
            } else {
                debug!(actor = %reminder.actor_id, reminder = %reminder.name, "reminder fired");
            }

            match reminder.period {
                Some(period) => {
                    let next = now + chrono::Duration::from_std(period).unwrap_or_else(|_| chrono::Duration::zero());
                    let _ = self
                        .table
                        .update_fire_time(&reminder.actor_id, &reminder.name, now, next)
                        .await;
                }
                None => {
                    let _ = self
                        .table
                        .unregister(&reminder.actor_id, &reminder.name)
                        .await;
                }
            }
        }
    }

    pub fn spawn(
        self: Arc<Self>,
        sink: Arc<dyn ReminderSink>,
    ) -> (tokio::task::JoinHandle<()>, tokio::sync::oneshot::Sender<()>) {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        let tick_interval = self.tick_interval;
        let task = tokio::spawn(async move {
            let mut ticker = interval(tick_interval);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        self.tick_once(sink.as_ref()).await;
                    }
                }
            }
        });
        (task, shutdown_tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::table::InMemoryReminderTable;
    use crate::ring::RingNode;
    use parking_lot::Mutex;

    struct RecordingSink {
        fired: Mutex<Vec<String>>,
        fail_names: Vec<String>,
    }

    #[async_trait::async_trait]
    impl ReminderSink for RecordingSink {
        async fn fire(&self, reminder: &Reminder) -> Result<(), String> {
            self.fired.lock().push(reminder.name.clone());
            if self.fail_names.contains(&reminder.name) {
                Err("target activation raised".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn periodic_reminder_advances_schedule() {
        let table = InMemoryReminderTable::new();
        let now = Utc::now();
        table
            .register(Reminder {
                actor_id: "a1".to_string(),
                actor_type: "Counter".to_string(),
                name: "tick".to_string(),
                period: Some(Duration::from_secs(30)),
                next_fire_time: now,
                last_fired_at: None,
            })
            .await
            .unwrap();
        let manager = ReminderTickManager::new(table.clone(), None, SiloId::new(), Duration::from_millis(10));
        let sink = Arc::new(RecordingSink {
            fired: Mutex::new(Vec::new()),
            fail_names: Vec::new(),
        });
        manager.tick_once(sink.as_ref()).await;
        let reminders = table.get_reminders("a1").await;
        assert_eq!(reminders.len(), 1);
        assert!(reminders[0].next_fire_time > now);
        assert_eq!(sink.fired.lock().len(), 1);
    }

    #[tokio::test]
    async fn one_shot_reminder_unregisters_after_fire() {
        let table = InMemoryReminderTable::new();
        table
            .register(Reminder {
                actor_id: "a1".to_string(),
                actor_type: "Counter".to_string(),
                name: "once".to_string(),
                period: None,
                next_fire_time: Utc::now(),
                last_fired_at: None,
            })
            .await
            .unwrap();
        let manager = ReminderTickManager::new(table.clone(), None, SiloId::new(), Duration::from_millis(10));
        let sink = Arc::new(RecordingSink {
            fired: Mutex::new(Vec::new()),
            fail_names: Vec::new(),
        });
        manager.tick_once(sink.as_ref()).await;
        assert!(table.get_reminders("a1").await.is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_still_advances_schedule() {
        let table = InMemoryReminderTable::new();
        let now = Utc::now();
        table
            .register(Reminder {
                actor_id: "a1".to_string(),
                actor_type: "Counter".to_string(),
                name: "flaky".to_string(),
                period: Some(Duration::from_secs(10)),
                next_fire_time: now,
                last_fired_at: None,
            })
            .await
            .unwrap();
        let manager = ReminderTickManager::new(table.clone(), None, SiloId::new(), Duration::from_millis(10));
        let sink = Arc::new(RecordingSink {
            fired: Mutex::new(Vec::new()),
            fail_names: vec!["flaky".to_string()],
        });
        manager.tick_once(sink.as_ref()).await;
        let reminders = table.get_reminders("a1").await;
        assert!(reminders[0].next_fire_time > now);
    }

    #[tokio::test]
    async fn ring_filters_reminders_to_owning_silo() {
        let table = InMemoryReminderTable::new();
        let ring = Arc::new(HashRing::new());
        let owner = SiloId::new();
        let other = SiloId::new();
        ring.add_node(RingNode::new(owner));
        table
            .register(Reminder {
                actor_id: "a1".to_string(),
                actor_type: "Counter".to_string(),
                name: "ping".to_string(),
                period: None,
                next_fire_time: Utc::now(),
                last_fired_at: None,
            })
            .await
            .unwrap();
        let manager_other = ReminderTickManager::new(table.clone(), Some(ring.clone()), other, Duration::from_millis(10));
        let sink = Arc::new(RecordingSink {
            fired: Mutex::new(Vec::new()),
            fail_names: Vec::new(),
        });
        manager_other.tick_once(sink.as_ref()).await;
        assert!(sink.fired.lock().is_empty(), "non-owning silo must not fire");
    }
}
