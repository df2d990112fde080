//! Stream backpressure modes: what a publisher experiences once a
//! stream's buffer or rate budget is exhausted.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleOverflow {
    Drop,
    Block,
}

#[derive(Debug, Clone, Copy)]
pub enum BackpressureMode {
    /// Direct dispatch, no buffer: fan-out is synchronous from the
    /// publisher's perspective.
    None,
    /// Bounded buffer; on overflow, evict the oldest buffered message.
    DropOldest { buffer_size: usize },
    /// Bounded buffer; on overflow, reject the publish.
    DropNewest { buffer_size: usize },
    /// Bounded buffer; publisher suspends until space is available.
    Block { buffer_size: usize },
    /// Token-bucket rate limit on top of a bounded buffer; over-limit
    /// publishes are dropped or blocked per `overflow`.
    Throttle {
        max_messages_per_window: u32,
        window: Duration,
        buffer_size: usize,
        overflow: ThrottleOverflow,
    },
}

impl Default for BackpressureMode {
    fn default() -> Self {
        BackpressureMode::None
    }
}

impl BackpressureMode {
    pub fn buffer_size(&self) -> Option<usize> {
        match self {
            BackpressureMode::None => None,
            BackpressureMode::DropOldest { buffer_size }
            | BackpressureMode::DropNewest { buffer_size }
            | BackpressureMode::Block { buffer_size }
            | BackpressureMode::Throttle { buffer_size, .. } => Some(*buffer_size),
        }
    }
}
