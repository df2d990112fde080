//! Shared identifiers and small helpers used across the runtime.

mod context;
mod ids;

pub use context::CallContext;
pub use ids::{composite_key, ActorIdentity, MessageId, SiloId};
