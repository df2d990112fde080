//! Dead-letter queue: bounded FIFO of undeliverable/failed messages with
//! replay.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::message::Envelope;
use crate::util::MessageId;

#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub message: Envelope,
    pub actor_id: String,
    pub exception: String,
    pub timestamp: DateTime<Utc>,
    /// Monotonic insertion counter, the stable secondary sort key for
    /// oldest-first eviction when timestamps tie.
    pub sequence: u64,
}

/// Bounded FIFO of dead letters. Oldest entries are evicted first once
/// `max_messages` is exceeded.
pub struct DeadLetterQueue {
    max_messages: usize,
    entries: Mutex<VecDeque<DeadLetter>>,
    next_sequence: AtomicU64,
}

impl DeadLetterQueue {
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages,
            entries: Mutex::new(VecDeque::new()),
            next_sequence: AtomicU64::new(0),
        }
    }

    pub fn add(&self, message: Envelope, actor_id: impl Into<String>, exception: impl Into<String>) {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.lock();
        entries.push_back(DeadLetter {
            message,
            actor_id: actor_id.into(),
            exception: exception.into(),
            timestamp: Utc::now(),
            sequence,
        });
        while entries.len() > self.max_messages {
            entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, message_id: MessageId) -> Option<DeadLetter> {
        self.entries
            .lock()
            .iter()
            .find(|d| d.message.message_id == message_id)
            .cloned()
    }

    pub fn get_by_actor(&self, actor_id: &str) -> Vec<DeadLetter> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.actor_id == actor_id)
            .cloned()
            .collect()
    }

    pub fn remove(&self, message_id: MessageId) -> Option<DeadLetter> {
        let mut entries = self.entries.lock();
        let pos = entries.iter().position(|d| d.message.message_id == message_id)?;
        entries.remove(pos)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn all(&self) -> Vec<DeadLetter> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Re-post a dead letter to its owning mailbox via `repost`, removing
    /// it from the queue only once the repost succeeds.
    pub async fn replay<F, Fut>(&self, message_id: MessageId, repost: F) -> bool
    where
        F: FnOnce(Envelope) -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let Some(entry) = self.get(message_id) else {
            return false;
        };
        if repost(entry.message).await {
            self.remove(message_id);
            true
        } else {
            false
        }
    }

    /// Best-effort replay of every entry currently in the queue. Returns
    /// the number of entries successfully replayed.
    pub async fn replay_batch<F, Fut>(&self, mut repost: F) -> usize
    where
        F: FnMut(Envelope) -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let ids: Vec<MessageId> = self.all().iter().map(|d| d.message.message_id).collect();
        let mut succeeded = 0;
        for id in ids {
            if self.replay(id, &mut repost).await {
                succeeded += 1;
            }
        }
        succeeded
    }

    /// Best-effort replay of every entry for one actor.
    pub async fn replay_by_actor<F, Fut>(&self, actor_id: &str, mut repost: F) -> usize
    where
        F: FnMut(Envelope) -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let ids: Vec<MessageId> = self
            .get_by_actor(actor_id)
            .iter()
            .map(|d| d.message.message_id)
            .collect();
        let mut succeeded = 0;
        for id in ids {
            if self.replay(id, &mut repost).await {
                succeeded += 1;
            }
        }
        succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> Envelope {
        Envelope::request("Counter", "a1", "Increment", vec![])
    }

    #[test]
    fn bounded_fifo_evicts_oldest_first() {
        let dlq = DeadLetterQueue::new(3);
        let mut ids = Vec::new();
        for _ in 0..5 {
            let e = envelope();
            ids.push(e.message_id);
            dlq.add(e, "a1", "boom");
        }
        assert_eq!(dlq.len(), 3);
        let remaining: Vec<MessageId> = dlq.all().iter().map(|d| d.message.message_id).collect();
        assert_eq!(remaining, ids[2..]);
    }

    #[tokio::test]
    async fn replay_removes_on_success() {
        let dlq = DeadLetterQueue::new(10);
        let e = envelope();
        let id = e.message_id;
        dlq.add(e, "a1", "boom");
        let replayed = dlq.replay(id, |_msg| async { true }).await;
        assert!(replayed);
        assert_eq!(dlq.len(), 0);
    }

    #[tokio::test]
    async fn replay_keeps_entry_on_failure() {
        let dlq = DeadLetterQueue::new(10);
        let e = envelope();
        let id = e.message_id;
        dlq.add(e, "a1", "boom");
        let replayed = dlq.replay(id, |_msg| async { false }).await;
        assert!(!replayed);
        assert_eq!(dlq.len(), 1);
    }

    #[test]
    fn get_by_actor_filters() {
        let dlq = DeadLetterQueue::new(10);
        dlq.add(envelope(), "a1", "boom");
        dlq.add(Envelope::request("Counter", "a2", "Increment", vec![]), "a2", "boom");
        assert_eq!(dlq.get_by_actor("a1").len(), 1);
    }
}
