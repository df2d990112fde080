//! Identifier newtypes used throughout the runtime.

// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a silo process within a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiloId(Uuid);

impl SiloId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SiloId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SiloId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a request/response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location-transparent actor identity: `(actorType, actorId)`.
///
/// Equality and hashing are defined purely on `(actor_type, actor_id)` so
/// an `ActorIdentity` can key directories, caches and trackers directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorIdentity {
    pub actor_type: String,
    pub actor_id: String,
}

impl ActorIdentity {
    pub fn new(actor_type: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            actor_type: actor_type.into(),
            actor_id: actor_id.into(),
        }
    }

    /// The composite key used for hash ring placement: `"{type}/{id}"`.
    pub fn composite_key(&self) -> String {
        composite_key(&self.actor_type, &self.actor_id)
    }
}

impl Display for ActorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_type, self.actor_id)
    }
}

/// Build the composite placement key for a `(type, id)` pair without
/// allocating an intermediate `ActorIdentity`.
pub fn composite_key(actor_type: &str, actor_id: &str) -> String {
    format!("{actor_type}/{actor_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silo_id_unique() {
        assert_ne!(SiloId::new(), SiloId::new());
    }

    #[test]
    fn actor_identity_equality_is_type_and_id() {
        let a = ActorIdentity::new("Counter", "a1");
        let b = ActorIdentity::new("Counter", "a1");
        let c = ActorIdentity::new("Counter", "a2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn composite_key_matches_format() {
        let id = ActorIdentity::new("Counter", "a1");
        assert_eq!(id.composite_key(), "Counter/a1");
        assert_eq!(composite_key("Counter", "a1"), id.composite_key());
    }
}
