//! Aggregated error kinds surfaced to callers/clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiloError {
    #[error("no dispatcher registered for actor type: {0}")]
    NoDispatcher(String),

    #[error("concurrency conflict: expected version {expected}, actual {actual}")]
    ConcurrencyConflict { expected: u64, actual: u64 },

    #[error("request timed out")]
    Timeout,

    #[error("rate limited")]
    RateLimited,

    #[error("reentrant call into non-reentrant actor {0}")]
    Reentrancy(String),

    #[error("actor {0} is already being migrated")]
    MigrationInProgress(String),

    #[error("dispatcher exception: {0}")]
    DispatcherException(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),
}
