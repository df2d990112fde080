//! Mailbox circuit breaker.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub sampling_window: Duration,
    pub timeout: Duration,
    pub success_threshold: u32,
}

struct Inner {
    state: CircuitState,
    failures: VecDeque<Instant>,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
}

/// `Closed -> Open -> HalfOpen -> Closed` state machine. HalfOpen admits
/// a single in-flight probe enforced
/// by `probe_in_flight`.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    probe_in_flight: AtomicBool,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: VecDeque::new(),
                consecutive_successes: 0,
                opened_at: None,
            }),
            probe_in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Whether a new call may proceed. In `HalfOpen`, only one probe is
    /// admitted at a time; subsequent callers are denied until the probe
    /// resolves via `record_success`/`record_failure`.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.config.timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.consecutive_successes = 0;
                    drop(inner);
                    self.try_claim_probe()
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => self.try_claim_probe(),
        }
    }

    fn try_claim_probe(&self) -> bool {
        self.probe_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failures.clear();
                    inner.consecutive_successes = 0;
                }
                self.probe_in_flight.store(false, Ordering::Release);
            }
            CircuitState::Closed => {
                inner.failures.clear();
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
                inner.consecutive_successes = 0;
                self.probe_in_flight.store(false, Ordering::Release);
            }
            CircuitState::Closed => {
                let window = self.config.sampling_window;
                inner.failures.push_back(now);
                while let Some(front) = inner.failures.front() {
                    if now.duration_since(*front) > window {
                        inner.failures.pop_front();
                    } else {
                        break;
                    }
                }
                if inner.failures.len() as u32 >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(now);
                    inner.failures.clear();
                }
            }
            CircuitState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            sampling_window: Duration::from_secs(10),
            timeout: Duration::from_millis(20),
            success_threshold: 2,
        }
    }

    #[test]
    fn opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            assert!(breaker.allow_request());
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[tokio::test]
    async fn transitions_to_half_open_after_timeout_then_closes() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            breaker.allow_request();
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_admits_single_probe() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            breaker.allow_request();
            breaker.record_failure();
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(breaker.allow_request());
        assert!(!breaker.allow_request(), "second probe must be denied");
    }
}
