//! Per-actor mailbox: serialization, backpressure and dead-letter handling.

mod adaptive;
mod circuit_breaker;
mod core;
mod dead_letter;
mod rate_limit;

pub use adaptive::{AdaptiveCapacity, AdaptiveConfig};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use core::{Mailbox, MailboxConfig, MailboxError};
pub use dead_letter::{DeadLetter, DeadLetterQueue};
pub use rate_limit::{RateLimitAction, RateLimitConfig, RateLimitOutcome, RateLimiter};
