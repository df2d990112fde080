//! Per-stream counters, all relaxed atomics: snapshots are advisory.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct StreamMetrics {
    messages_published: AtomicU64,
    messages_dropped: AtomicU64,
    throttle_events: AtomicU64,
    current_buffer_depth: AtomicI64,
    peak_buffer_depth: AtomicI64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_published(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_throttled(&self) {
        self.throttle_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_buffer_depth(&self, depth: i64) {
        self.current_buffer_depth.store(depth, Ordering::Relaxed);
        let mut peak = self.peak_buffer_depth.load(Ordering::Relaxed);
        while depth > peak {
            match self.peak_buffer_depth.compare_exchange_weak(
                peak,
                depth,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => peak = observed,
            }
        }
    }

    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    pub fn throttle_events(&self) -> u64 {
        self.throttle_events.load(Ordering::Relaxed)
    }

    pub fn current_buffer_depth(&self) -> i64 {
        self.current_buffer_depth.load(Ordering::Relaxed)
    }

    pub fn peak_buffer_depth(&self) -> i64 {
        self.peak_buffer_depth.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.messages_published.store(0, Ordering::Relaxed);
        self.messages_dropped.store(0, Ordering::Relaxed);
        self.throttle_events.store(0, Ordering::Relaxed);
        self.current_buffer_depth.store(0, Ordering::Relaxed);
        self.peak_buffer_depth.store(0, Ordering::Relaxed);
    }
}
