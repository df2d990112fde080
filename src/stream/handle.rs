//! `StreamHandle<T>`: a single namespace/key-addressed stream with
//! subscriber fan-out and backpressure.
//!
//! Buffered modes reuse the mailbox's queue/`Notify` idiom: publishers
//! enqueue under a short lock and a drain loop fans each value out to
//! the typed callback list.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::backpressure::{BackpressureMode, ThrottleOverflow};
use super::metrics::StreamMetrics;
use crate::mailbox::{RateLimitAction, RateLimitConfig, RateLimiter};

pub type StreamCallback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// A live subscription. Dropping it does not unsubscribe; removal is an
/// explicit `unsubscribe` call so a handle can be passed around freely.
pub struct Subscription<T> {
    id: u64,
    handle: Arc<StreamHandle<T>>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub fn unsubscribe(&self) {
        self.handle.subscribers.remove(&self.id);
    }
}

pub struct StreamHandle<T> {
    pub namespace: String,
    pub key: String,
    mode: BackpressureMode,
    subscribers: DashMap<u64, StreamCallback<T>>,
    next_subscriber_id: AtomicU64,
    buffer: Mutex<VecDeque<T>>,
    notify_item: Notify,
    notify_space: Notify,
    throttle: Option<RateLimiter>,
    pub metrics: StreamMetrics,
}

impl<T: Clone + Send + Sync + 'static> StreamHandle<T> {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, mode: BackpressureMode) -> Arc<Self> {
        let throttle = match mode {
            BackpressureMode::Throttle { max_messages_per_window, window, overflow, .. } => {
                let action = match overflow {
                    ThrottleOverflow::Drop => RateLimitAction::Drop,
                    ThrottleOverflow::Block => RateLimitAction::Queue,
                };
                Some(RateLimiter::new(RateLimitConfig { max_messages_per_window, window, action }))
            }
            _ => None,
        };
        Arc::new(Self {
            namespace: namespace.into(),
            key: key.into(),
            mode,
            subscribers: DashMap::new(),
            next_subscriber_id: AtomicU64::new(1),
            buffer: Mutex::new(VecDeque::new()),
            notify_item: Notify::new(),
            notify_space: Notify::new(),
            throttle,
            metrics: StreamMetrics::new(),
        })
    }

    pub fn subscribe(self: &Arc<Self>, callback: StreamCallback<T>) -> Subscription<T> {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, callback);
        Subscription { id, handle: Arc::clone(self) }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Publishes a value per the configured backpressure mode. Returns
    /// `true` if the value was accepted (dispatched or buffered), `false`
    /// if it was dropped/rejected.
    pub async fn publish(self: &Arc<Self>, value: T) -> bool {
        match self.mode {
            BackpressureMode::None => {
                self.dispatch(value).await;
                self.metrics.record_published();
                true
            }
            BackpressureMode::DropOldest { buffer_size } => {
                let mut buffer = self.buffer.lock();
                if buffer.len() >= buffer_size {
                    buffer.pop_front();
                    self.metrics.record_dropped();
                }
                buffer.push_back(value);
                self.metrics.set_buffer_depth(buffer.len() as i64);
                drop(buffer);
                self.notify_item.notify_one();
                self.metrics.record_published();
                true
            }
            BackpressureMode::DropNewest { buffer_size } => {
                let mut buffer = self.buffer.lock();
                if buffer.len() >= buffer_size {
                    self.metrics.record_dropped();
                    return false;
                }
                buffer.push_back(value);
                self.metrics.set_buffer_depth(buffer.len() as i64);
                drop(buffer);
                self.notify_item.notify_one();
                self.metrics.record_published();
                true
            }
            BackpressureMode::Block { buffer_size } => {
                loop {
                    {
                        let mut buffer = self.buffer.lock();
                        if buffer.len() < buffer_size {
                            buffer.push_back(value);
                            self.metrics.set_buffer_depth(buffer.len() as i64);
                            drop(buffer);
                            self.notify_item.notify_one();
                            self.metrics.record_published();
                            return true;
                        }
                    }
                    self.notify_space.notified().await;
                }
            }
            BackpressureMode::Throttle { buffer_size, .. } => {
                if let Some(limiter) = self.throttle.as_ref() {
                    match limiter.admit().await {
                        Ok(true) => {}
                        Ok(false) | Err(()) => {
                            self.metrics.record_throttled();
                            self.metrics.record_dropped();
                            return false;
                        }
                    }
                }
                let mut buffer = self.buffer.lock();
                if buffer.len() >= buffer_size {
                    self.metrics.record_dropped();
                    return false;
                }
                buffer.push_back(value);
                self.metrics.set_buffer_depth(buffer.len() as i64);
                drop(buffer);
                self.notify_item.notify_one();
                self.metrics.record_published();
                true
            }
        }
    }

    /// Drains one buffered value (if any) and fans it out to all live
    /// subscribers. Callers of buffered modes should run this in a loop
    /// driven by `notify_item`; `StreamProvider::spawn_dispatch_loop` does
    /// so for every handle it creates.
    pub async fn drain_one(self: &Arc<Self>) -> bool {
        let value = {
            let mut buffer = self.buffer.lock();
            let value = buffer.pop_front();
            self.metrics.set_buffer_depth(buffer.len() as i64);
            value
        };
        self.notify_space.notify_one();
        match value {
            Some(value) => {
                self.dispatch(value).await;
                true
            }
            None => false,
        }
    }

    pub async fn wait_for_item(&self) {
        self.notify_item.notified().await;
    }

    async fn dispatch(&self, value: T) {
        let callbacks: Vec<_> = self.subscribers.iter().map(|e| Arc::clone(e.value())).collect();
        let futures = callbacks.into_iter().map(|callback| callback(value.clone()));
        futures::future::join_all(futures).await;
    }
}
