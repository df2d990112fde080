//! Tracing bootstrap for binaries and integration tests.

// Layer 1: Standard library imports
use std::sync::Once;

// Layer 2: Third-party crate imports
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install the global subscriber, honoring `RUST_LOG` and defaulting to
/// `info`. Idempotent so every integration test can call it freely.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt().with_env_filter(filter).with_target(false).try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
