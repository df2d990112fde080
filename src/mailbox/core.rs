//! Per-actor FIFO mailbox with a single consumer.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, Notify};

use super::adaptive::{AdaptiveCapacity, AdaptiveConfig};
use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use super::dead_letter::DeadLetterQueue;
use super::rate_limit::{RateLimitConfig, RateLimiter};
use crate::message::Envelope;

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("mailbox rejected message under rate limit")]
    RateLimited,
    #[error("circuit open")]
    CircuitOpen,
    #[error("mailbox is stopped")]
    Stopped,
}

/// Everything configurable about one activation's mailbox. Rate limiting,
/// circuit breaking and adaptive capacity are all disabled by default.
#[derive(Debug, Clone, Copy)]
pub struct MailboxConfig {
    pub capacity: usize,
    pub rate_limit: Option<RateLimitConfig>,
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    pub adaptive: Option<AdaptiveConfig>,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            rate_limit: None,
            circuit_breaker: None,
            adaptive: None,
        }
    }
}

/// Per-actor message queue. `post` is the only entry point producers use;
/// `run` is driven by the single consumer task that owns this activation.
pub struct Mailbox {
    pub actor_id: String,
    queue: Mutex<VecDeque<Envelope>>,
    notify_consumer: Notify,
    notify_space: Notify,
    capacity: AtomicUsize,
    processing: AtomicBool,
    stopped: AtomicBool,
    draining: AtomicBool,
    rate_limiter: Option<RateLimiter>,
    circuit_breaker: Option<CircuitBreaker>,
    dead_letters: Option<Arc<DeadLetterQueue>>,
    adaptive: Option<Mutex<AdaptiveCapacity>>,
}

impl Mailbox {
    pub fn new(actor_id: impl Into<String>, capacity: usize) -> Self {
        Self {
            actor_id: actor_id.into(),
            queue: Mutex::new(VecDeque::new()),
            notify_consumer: Notify::new(),
            notify_space: Notify::new(),
            capacity: AtomicUsize::new(capacity),
            processing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            rate_limiter: None,
            circuit_breaker: None,
            dead_letters: None,
            adaptive: None,
        }
    }

    /// Build a mailbox with every optional feature the config enables.
    /// When adaptive sizing is on, the adaptive `initial_capacity` wins
    /// over the flat `capacity`.
    pub fn from_config(actor_id: impl Into<String>, config: &MailboxConfig) -> Self {
        let capacity = config
            .adaptive
            .map(|a| a.initial_capacity)
            .unwrap_or(config.capacity);
        let mut mailbox = Self::new(actor_id, capacity);
        if let Some(rate_limit) = config.rate_limit {
            mailbox = mailbox.with_rate_limiter(RateLimiter::new(rate_limit));
        }
        if let Some(breaker) = config.circuit_breaker {
            mailbox = mailbox.with_circuit_breaker(CircuitBreaker::new(breaker));
        }
        if let Some(adaptive) = config.adaptive {
            mailbox = mailbox.with_adaptive(AdaptiveCapacity::new(adaptive, true));
        }
        mailbox
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    pub fn with_dead_letters(mut self, dlq: Arc<DeadLetterQueue>) -> Self {
        self.dead_letters = Some(dlq);
        self
    }

    pub fn with_adaptive(mut self, adaptive: AdaptiveCapacity) -> Self {
        self.adaptive = Some(Mutex::new(adaptive));
        self
    }

    pub fn dead_letters(&self) -> Option<&Arc<DeadLetterQueue>> {
        self.dead_letters.as_ref()
    }

    pub async fn message_count(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Mark the mailbox as draining: no new posts are accepted; in-flight
    /// messages already enqueued are still processed.
    pub fn begin_drain(&self) {
        self.draining.store(true, Ordering::Release);
    }

    /// Enqueue a message. Returns `Ok(true)` on success, `Ok(false)` if
    /// dropped under a `Drop`-mode rate limit, `Err` if rejected under a
    /// `Reject`-mode rate limit, if the circuit is open, if stopped, or
    /// if draining.
    ///
    /// Circuit admission happens here rather than in the consumer loop so
    /// a denied call fails at the producer, where a response can still be
    /// sent, instead of vanishing after it was already queued.
    pub async fn post(&self, envelope: Envelope) -> Result<bool, MailboxError> {
        if self.stopped.load(Ordering::Acquire) || self.draining.load(Ordering::Acquire) {
            return Err(MailboxError::Stopped);
        }
        if let Some(limiter) = &self.rate_limiter {
            match limiter.admit().await {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(()) => return Err(MailboxError::RateLimited),
            }
        }
        if let Some(breaker) = &self.circuit_breaker {
            if !breaker.allow_request() {
                return Err(MailboxError::CircuitOpen);
            }
        }

        loop {
            let capacity = self.capacity.load(Ordering::Acquire);
            {
                let mut queue = self.queue.lock().await;
                if queue.len() < capacity {
                    queue.push_back(envelope);
                    let fill_ratio = queue.len() as f64 / capacity as f64;
                    drop(queue);
                    self.notify_consumer.notify_one();
                    self.record_fill_sample(fill_ratio, capacity).await;
                    return Ok(true);
                }
            }
            self.notify_space.notified().await;
        }
    }

    async fn record_fill_sample(&self, fill_ratio: f64, current_capacity: usize) {
        if let Some(adaptive) = &self.adaptive {
            let mut adaptive = adaptive.lock().await;
            if let Some(new_capacity) = adaptive.record(fill_ratio, current_capacity) {
                self.capacity.store(new_capacity, Ordering::Release);
            }
        }
    }

    async fn pop(&self) -> Option<Envelope> {
        loop {
            {
                let mut queue = self.queue.lock().await;
                if let Some(envelope) = queue.pop_front() {
                    drop(queue);
                    self.notify_space.notify_one();
                    return Some(envelope);
                }
            }
            if self.stopped.load(Ordering::Acquire) {
                return None;
            }
            self.notify_consumer.notified().await;
            if self.stopped.load(Ordering::Acquire) {
                let mut queue = self.queue.lock().await;
                if let Some(envelope) = queue.pop_front() {
                    return Some(envelope);
                }
                return None;
            }
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.notify_consumer.notify_waiters();
    }

    pub async fn active_call_count_hint(&self) -> usize {
        // Single consumer, so at most one in-flight call; exposed for the
        // migration coordinator's drain-completion check.
        usize::from(self.is_processing())
    }

    /// Drain the queue sequentially, invoking `handler` once per message.
    /// `handler` returns `Err(reason)` on dispatcher exception; the
    /// failure never kills this loop: it is recorded to the dead-letter
    /// queue (if configured) and processing continues.
    pub async fn run<F, Fut>(self: Arc<Self>, mut handler: F)
    where
        F: FnMut(Envelope) -> Fut + Send,
        Fut: Future<Output = Result<(), String>> + Send,
    {
        self.processing.store(true, Ordering::Release);
        while let Some(envelope) = self.pop().await {
            let result = handler(envelope.clone()).await;
            match &result {
                Ok(()) => {
                    if let Some(breaker) = &self.circuit_breaker {
                        breaker.record_success();
                    }
                }
                Err(reason) => {
                    if let Some(breaker) = &self.circuit_breaker {
                        breaker.record_failure();
                    }
                    if let Some(dlq) = &self.dead_letters {
                        dlq.add(envelope, &self.actor_id, reason.clone());
                    }
                }
            }
        }
        self.processing.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::RateLimitAction;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    fn envelope(actor_id: &str) -> Envelope {
        Envelope::request("Counter", actor_id, "Increment", vec![])
    }

    #[tokio::test]
    async fn from_config_applies_rate_limit() {
        let config = MailboxConfig {
            rate_limit: Some(RateLimitConfig {
                max_messages_per_window: 2,
                window: Duration::from_secs(1),
                action: RateLimitAction::Drop,
            }),
            ..Default::default()
        };
        let mailbox = Mailbox::from_config("a1", &config);
        assert!(mailbox.post(envelope("a1")).await.unwrap());
        assert!(mailbox.post(envelope("a1")).await.unwrap());
        assert!(!mailbox.post(envelope("a1")).await.unwrap());
    }

    #[tokio::test]
    async fn from_config_adaptive_overrides_flat_capacity() {
        let config = MailboxConfig {
            capacity: 7,
            adaptive: Some(AdaptiveConfig {
                initial_capacity: 2,
                ..Default::default()
            }),
            ..Default::default()
        };
        let mailbox = Arc::new(Mailbox::from_config("a1", &config));
        mailbox.post(envelope("a1")).await.unwrap();
        mailbox.post(envelope("a1")).await.unwrap();
        assert_eq!(mailbox.message_count().await, 2);
    }

    #[tokio::test]
    async fn open_circuit_rejects_posts() {
        let config = MailboxConfig {
            circuit_breaker: Some(CircuitBreakerConfig {
                failure_threshold: 2,
                sampling_window: Duration::from_secs(10),
                timeout: Duration::from_secs(10),
                success_threshold: 1,
            }),
            ..Default::default()
        };
        let mailbox = Arc::new(Mailbox::from_config("a1", &config));
        for _ in 0..2 {
            mailbox.post(envelope("a1")).await.unwrap();
        }
        let consumer = {
            let mailbox = Arc::clone(&mailbox);
            tokio::spawn(async move {
                mailbox.run(|_env| async { Err("boom".to_string()) }).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        let err = mailbox.post(envelope("a1")).await.unwrap_err();
        assert!(matches!(err, MailboxError::CircuitOpen));
        mailbox.stop();
        consumer.await.unwrap();
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let mailbox = Arc::new(Mailbox::new("a1", 100));
        for i in 0..10 {
            mailbox.post(envelope(&i.to_string())).await.unwrap();
        }
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let handle = tokio::spawn({
            let mailbox = mailbox.clone();
            async move {
                mailbox
                    .run(|env| {
                        let seen = seen_clone.clone();
                        async move {
                            seen.lock().await.push(env.actor_id.clone());
                            Ok(())
                        }
                    })
                    .await;
            }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        mailbox.stop();
        handle.await.unwrap();
        let order: Vec<String> = seen.lock().await.clone();
        let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(order, expected);
    }

    #[tokio::test]
    async fn serial_execution_never_overlaps() {
        let mailbox = Arc::new(Mailbox::new("a1", 100));
        for i in 0..20 {
            mailbox.post(envelope(&i.to_string())).await.unwrap();
        }
        let concurrent = Arc::new(AtomicU32::new(0));
        let max_concurrent = Arc::new(AtomicU32::new(0));
        let concurrent_clone = concurrent.clone();
        let max_clone = max_concurrent.clone();
        let handle = {
            let mailbox = mailbox.clone();
            tokio::spawn(async move {
                mailbox
                    .run(|_env| {
                        let concurrent = concurrent_clone.clone();
                        let max_concurrent = max_clone.clone();
                        async move {
                            let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                            max_concurrent.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                            concurrent.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        }
                    })
                    .await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        mailbox.stop();
        handle.await.unwrap();
        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_message_goes_to_dead_letter_queue() {
        let dlq = Arc::new(DeadLetterQueue::new(10));
        let mailbox = Arc::new(Mailbox::new("a1", 10).with_dead_letters(dlq.clone()));
        mailbox.post(envelope("a1")).await.unwrap();
        let handle = {
            let mailbox = mailbox.clone();
            tokio::spawn(async move {
                mailbox.run(|_env| async { Err("boom".to_string()) }).await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        mailbox.stop();
        handle.await.unwrap();
        assert_eq!(dlq.len(), 1);
    }
}
