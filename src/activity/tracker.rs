//! Per-actor activity counters and hot/cold classification.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use dashmap::DashMap;

// Layer 3: Internal module imports
use crate::util::ActorIdentity;

/// Snapshot of one actor's activity counters, taken at `getActivityMetrics`
/// time. Derived fields (`activity_score`, `is_hot`/`is_cold`) are computed
/// from the live record at snapshot time, not stored.
#[derive(Debug, Clone, Copy)]
pub struct ActivityMetrics {
    pub queue_depth: u32,
    pub active_call_count: u32,
    pub last_activity_time: DateTime<Utc>,
    pub has_active_streams: bool,
    pub activity_score: f64,
}

impl ActivityMetrics {
    /// Any of these conditions marks an actor hot.
    pub fn is_hot(&self) -> bool {
        self.active_call_count > 0
            || self.queue_depth > 2
            || self.has_active_streams
            || self.activity_score > 0.5
    }

    pub fn is_cold(&self) -> bool {
        !self.is_hot()
    }
}

/// Atomic per-actor record. Every mutating operation is a single atomic op
/// so recording activity never suspends or contends a lock.
struct Record {
    queue_depth: AtomicU32,
    active_call_count: AtomicU32,
    last_activity_millis: AtomicI64,
    has_active_streams: AtomicBool,
}

impl Record {
    fn new() -> Self {
        Self {
            queue_depth: AtomicU32::new(0),
            active_call_count: AtomicU32::new(0),
            last_activity_millis: AtomicI64::new(Utc::now().timestamp_millis()),
            has_active_streams: AtomicBool::new(false),
        }
    }

    fn touch(&self) {
        self.last_activity_millis
            .store(Utc::now().timestamp_millis(), Ordering::Release);
    }

    fn snapshot(&self) -> ActivityMetrics {
        let queue_depth = self.queue_depth.load(Ordering::Acquire);
        let active_call_count = self.active_call_count.load(Ordering::Acquire);
        let has_active_streams = self.has_active_streams.load(Ordering::Acquire);
        let last_activity_time = DateTime::<Utc>::from_timestamp_millis(
            self.last_activity_millis.load(Ordering::Acquire),
        )
        .unwrap_or_else(Utc::now);
        let score = activity_score(
            active_call_count,
            queue_depth,
            has_active_streams,
            last_activity_time,
        );
        ActivityMetrics {
            queue_depth,
            active_call_count,
            last_activity_time,
            has_active_streams,
            activity_score: score,
        }
    }
}

/// Monotonic score in `[0,1]` built from recency, load and stream presence.
/// Enqueuing/dequeuing must strictly move the score, so each component
/// contributes additively rather than being clamped away independently.
fn activity_score(
    active_call_count: u32,
    queue_depth: u32,
    has_active_streams: bool,
    last_activity_time: DateTime<Utc>,
) -> f64 {
    let load_component = (active_call_count as f64 * 0.3 + queue_depth as f64 * 0.1).min(0.7);
    let stream_component = if has_active_streams { 0.2 } else { 0.0 };
    let age_secs = (Utc::now() - last_activity_time).num_seconds().max(0) as f64;
    let recency_component = 0.1 * (-age_secs / 60.0).exp();
    (load_component + stream_component + recency_component).clamp(0.0, 1.0)
}

/// Tracks activity counters for every currently-active actor in a silo.
pub struct ActivityTracker {
    records: DashMap<ActorIdentity, Record>,
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    fn entry(&self, id: &ActorIdentity) -> dashmap::mapref::one::RefMut<'_, ActorIdentity, Record> {
        self.records
            .entry(id.clone())
            .or_insert_with(Record::new)
    }

    pub fn record_message_enqueued(&self, id: &ActorIdentity) {
        let record = self.entry(id);
        record.queue_depth.fetch_add(1, Ordering::AcqRel);
        record.touch();
    }

    pub fn record_message_dequeued(&self, id: &ActorIdentity) {
        let record = self.entry(id);
        record
            .queue_depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                Some(v.saturating_sub(1))
            })
            .ok();
        record.touch();
    }

    pub fn record_call_started(&self, id: &ActorIdentity) {
        let record = self.entry(id);
        record.active_call_count.fetch_add(1, Ordering::AcqRel);
        record.touch();
    }

    pub fn record_call_completed(&self, id: &ActorIdentity) {
        let record = self.entry(id);
        record
            .active_call_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                Some(v.saturating_sub(1))
            })
            .ok();
        record.touch();
    }

    pub fn record_stream_activity(&self, id: &ActorIdentity, subscribed: bool) {
        let record = self.entry(id);
        record.has_active_streams.store(subscribed, Ordering::Release);
        record.touch();
    }

    pub fn remove(&self, id: &ActorIdentity) {
        self.records.remove(id);
    }

    pub fn get_activity_metrics(&self, id: &ActorIdentity) -> Option<ActivityMetrics> {
        self.records.get(id).map(|r| r.snapshot())
    }

    pub fn get_all_activity_metrics(&self) -> Vec<(ActorIdentity, ActivityMetrics)> {
        self.records
            .iter()
            .map(|r| (r.key().clone(), r.snapshot()))
            .collect()
    }

    /// Actors sorted cold-first: lowest `activity_score` (most migratable)
    /// comes first.
    pub fn get_migration_priority_list(&self) -> Vec<(ActorIdentity, ActivityMetrics)> {
        let mut all = self.get_all_activity_metrics();
        all.sort_by(|a, b| {
            a.1.activity_score
                .partial_cmp(&b.1.activity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: &str) -> ActorIdentity {
        ActorIdentity::new("Counter", n)
    }

    #[test]
    fn enqueue_then_dequeue_moves_score_in_opposite_directions() {
        let tracker = ActivityTracker::new();
        let a = id("a1");
        tracker.record_message_enqueued(&a);
        let after_enqueue = tracker.get_activity_metrics(&a).unwrap().activity_score;
        tracker.record_message_dequeued(&a);
        let after_dequeue = tracker.get_activity_metrics(&a).unwrap().activity_score;
        assert!(
            after_dequeue < after_enqueue,
            "dequeue must strictly lower the score ({after_dequeue} vs {after_enqueue})"
        );
    }

    #[test]
    fn hot_when_active_call_in_flight() {
        let tracker = ActivityTracker::new();
        let a = id("a1");
        tracker.record_call_started(&a);
        let metrics = tracker.get_activity_metrics(&a).unwrap();
        assert!(metrics.is_hot());
    }

    #[test]
    fn cold_when_idle() {
        let tracker = ActivityTracker::new();
        let a = id("a1");
        tracker.record_message_enqueued(&a);
        tracker.record_message_dequeued(&a);
        let metrics = tracker.get_activity_metrics(&a).unwrap();
        assert!(metrics.is_cold());
    }

    #[test]
    fn migration_priority_list_is_cold_first() {
        let tracker = ActivityTracker::new();
        let hot = id("hot");
        let cold = id("cold");
        tracker.record_call_started(&hot);
        tracker.record_message_enqueued(&cold);
        tracker.record_message_dequeued(&cold);
        let priorities = tracker.get_migration_priority_list();
        assert_eq!(priorities[0].0, cold);
        assert_eq!(priorities[1].0, hot);
    }
}
