//! Dispatcher registry: binds `(actorType, methodName)` to a typed
//! invocation over an envelope payload.
//!
//! Unlike the rest of this crate, dispatch is necessarily type-erased:
//! the actor type named on the wire is only known at runtime, so this is
//! the one seam where `dyn` is the right tool rather than a generic
//! constraint.

use async_trait::async_trait;
use dashmap::DashMap;
use std::any::Any;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("no dispatcher registered for actor type: {0}")]
    NoDispatcher(String),
    #[error("unknown method {method} on actor type {actor_type}")]
    UnknownMethod { actor_type: String, method: String },
    #[error("dispatcher exception: {0}")]
    Exception(String),
}

/// Opaque per-activation actor state, owned exclusively by the mailbox
/// processing task that created it.
pub type ActorInstance = Box<dyn Any + Send>;

/// Binds method invocations for one actor type to its concrete
/// implementation, decoding/encoding via the codec configured at
/// registration time.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn new_instance(&self, actor_id: &str) -> ActorInstance;

    /// Whether calls may re-enter an activation already on the current
    /// call chain. Defaults to non-reentrant: a cycle through this actor
    /// is rejected at the dispatch boundary rather than deadlocking on
    /// its own mailbox.
    fn is_reentrant(&self) -> bool {
        false
    }

    async fn invoke(
        &self,
        instance: &mut ActorInstance,
        method_name: &str,
        payload: &[u8],
    ) -> Result<Vec<u8>, DispatcherError>;
}

/// Static (bootstrap-time) mapping from actor type to [`Dispatcher`].
///
/// Keyed by the actor's **interface full name** rather than its concrete
/// implementation type name: clients only ever know the interface, so the
/// interface name is the stable wire contract.
#[derive(Default)]
pub struct DispatcherRegistry {
    dispatchers: DashMap<String, std::sync::Arc<dyn Dispatcher>>,
}

impl DispatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dispatcher under an interface full name. Registering
    /// the same name twice replaces the prior dispatcher.
    pub fn register(&self, interface_name: impl Into<String>, dispatcher: std::sync::Arc<dyn Dispatcher>) {
        self.dispatchers.insert(interface_name.into(), dispatcher);
    }

    pub fn resolve(&self, actor_type: &str) -> Result<std::sync::Arc<dyn Dispatcher>, DispatcherError> {
        self.dispatchers
            .get(actor_type)
            .map(|d| d.clone())
            .ok_or_else(|| DispatcherError::NoDispatcher(actor_type.to_string()))
    }

    pub fn contains(&self, actor_type: &str) -> bool {
        self.dispatchers.contains_key(actor_type)
    }
}
