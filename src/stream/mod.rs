//! Distributed stream provider: namespace/key streams with configurable
//! backpressure, subscriber fan-out, and windowing operators.

mod backpressure;
mod handle;
mod metrics;
mod provider;
mod window;

pub use backpressure::{BackpressureMode, ThrottleOverflow};
pub use handle::{StreamCallback, StreamHandle, Subscription};
pub use metrics::StreamMetrics;
pub use provider::StreamProvider;
pub use window::{count_windows, session_windows, sliding_windows, time_windows, Window, WindowKind};
