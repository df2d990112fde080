//! Token-bucket rate limiting for mailbox posts.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// What happens to a post once the per-window budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAction {
    /// Silently drop the message; `post` returns `Ok(false)`.
    Drop,
    /// Reject the post with a `RateLimited` error.
    Reject,
    /// Buffer the post until the window advances, then admit it.
    Queue,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_messages_per_window: u32,
    pub window: Duration,
    pub action: RateLimitAction,
}

/// Outcome of a single `try_acquire`.
pub enum RateLimitOutcome {
    Allowed,
    /// The window will advance after this `Duration`; caller decides
    /// whether to sleep (Queue) or reject immediately (Drop/Reject).
    Denied(Duration),
}

struct BucketState {
    window_start: Instant,
    used: u32,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BucketState {
                window_start: Instant::now(),
                used: 0,
            }),
        }
    }

    pub fn action(&self) -> RateLimitAction {
        self.config.action
    }

    fn try_acquire(&self) -> RateLimitOutcome {
        let now = Instant::now();
        let mut state = self.state.lock();
        if now.duration_since(state.window_start) >= self.config.window {
            state.window_start = now;
            state.used = 0;
        }
        if state.used < self.config.max_messages_per_window {
            state.used += 1;
            RateLimitOutcome::Allowed
        } else {
            let remaining = self.config.window - now.duration_since(state.window_start);
            RateLimitOutcome::Denied(remaining)
        }
    }

    /// Apply the configured action. Returns `Ok(true)` if the caller
    /// should proceed to enqueue, `Ok(false)` if the message was dropped,
    /// and `Err(())` if the message should be rejected.
    pub async fn admit(&self) -> Result<bool, ()> {
        loop {
            match self.try_acquire() {
                RateLimitOutcome::Allowed => return Ok(true),
                RateLimitOutcome::Denied(remaining) => match self.config.action {
                    RateLimitAction::Drop => return Ok(false),
                    RateLimitAction::Reject => return Err(()),
                    RateLimitAction::Queue => {
                        tokio::time::sleep(remaining).await;
                        continue;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drop_mode_returns_false_once_exhausted() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_messages_per_window: 5,
            window: Duration::from_secs(1),
            action: RateLimitAction::Drop,
        });
        let mut allowed = 0;
        let mut dropped = 0;
        for _ in 0..10 {
            match limiter.admit().await {
                Ok(true) => allowed += 1,
                Ok(false) => dropped += 1,
                Err(_) => unreachable!(),
            }
        }
        assert_eq!(allowed, 5);
        assert_eq!(dropped, 5);
    }

    #[tokio::test]
    async fn reject_mode_errors_once_exhausted() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_messages_per_window: 2,
            window: Duration::from_secs(1),
            action: RateLimitAction::Reject,
        });
        assert!(limiter.admit().await.is_ok());
        assert!(limiter.admit().await.is_ok());
        assert!(limiter.admit().await.is_err());
    }
}
