//! Actor state persistence contracts.
//!
//! Concrete stores (Redis, SQL) live outside this crate. State values are
//! opaque bytes: whatever codec the actor registered encodes them before
//! they reach this boundary.
//! [`InMemoryStateStore`] is the reference implementation the tests and
//! the migration coordinator's test harness run on.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("concurrency conflict: expected version {expected}, actual {actual}")]
    ConcurrencyConflict { expected: u64, actual: u64 },
    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

/// A loaded state value together with the version it was saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedState {
    pub state: Vec<u8>,
    pub version: u64,
}

/// Keyed actor state with optional optimistic concurrency. Versions start
/// at 1 on first save and increment by one per successful versioned save.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, actor_id: &str, name: &str) -> Result<Option<Vec<u8>>, StateError>;
    async fn save(&self, actor_id: &str, name: &str, state: Vec<u8>) -> Result<(), StateError>;
    async fn delete(&self, actor_id: &str, name: &str) -> Result<(), StateError>;

    async fn load_with_version(
        &self,
        actor_id: &str,
        name: &str,
    ) -> Result<Option<VersionedState>, StateError>;

    /// Save guarded by `expected_version`: `None` means "create only, no
    /// existing entry expected as versioned state"; a mismatch against the
    /// stored version raises [`StateError::ConcurrencyConflict`] carrying
    /// both sides. Returns the new version.
    async fn save_with_version(
        &self,
        actor_id: &str,
        name: &str,
        state: Vec<u8>,
        expected_version: Option<u64>,
    ) -> Result<u64, StateError>;
}

/// Append-only event log per actor, consumed by event-sourcing glue
/// outside the core; contract only.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, actor_id: &str, events: Vec<Vec<u8>>) -> Result<u64, StateError>;
    async fn read_from(&self, actor_id: &str, from_version: u64) -> Result<Vec<Vec<u8>>, StateError>;
}

/// Saga orchestration checkpoints, consumed by the saga machinery
/// outside the core; contract only.
#[async_trait]
pub trait SagaStateStore: Send + Sync {
    async fn save_saga(&self, saga_id: &str, state: Vec<u8>) -> Result<(), StateError>;
    async fn load_saga(&self, saga_id: &str) -> Result<Option<Vec<u8>>, StateError>;
    async fn delete_saga(&self, saga_id: &str) -> Result<(), StateError>;
}

#[derive(Debug, Clone)]
struct Entry {
    state: Vec<u8>,
    version: u64,
}

/// In-memory `StateStore`, keyed by `(actorId, name)`.
#[derive(Default)]
pub struct InMemoryStateStore {
    entries: RwLock<HashMap<(String, String), Entry>>,
}

impl InMemoryStateStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn key(actor_id: &str, name: &str) -> (String, String) {
        (actor_id.to_string(), name.to_string())
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self, actor_id: &str, name: &str) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self
            .entries
            .read()
            .get(&Self::key(actor_id, name))
            .map(|e| e.state.clone()))
    }

    async fn save(&self, actor_id: &str, name: &str, state: Vec<u8>) -> Result<(), StateError> {
        let mut entries = self.entries.write();
        let entry = entries
            .entry(Self::key(actor_id, name))
            .or_insert(Entry { state: Vec::new(), version: 0 });
        entry.state = state;
        entry.version += 1;
        Ok(())
    }

    async fn delete(&self, actor_id: &str, name: &str) -> Result<(), StateError> {
        self.entries.write().remove(&Self::key(actor_id, name));
        Ok(())
    }

    async fn load_with_version(
        &self,
        actor_id: &str,
        name: &str,
    ) -> Result<Option<VersionedState>, StateError> {
        Ok(self
            .entries
            .read()
            .get(&Self::key(actor_id, name))
            .map(|e| VersionedState { state: e.state.clone(), version: e.version }))
    }

    async fn save_with_version(
        &self,
        actor_id: &str,
        name: &str,
        state: Vec<u8>,
        expected_version: Option<u64>,
    ) -> Result<u64, StateError> {
        let mut entries = self.entries.write();
        let key = Self::key(actor_id, name);
        let actual = entries.get(&key).map(|e| e.version).unwrap_or(0);
        let expected = expected_version.unwrap_or(0);
        if expected != actual {
            return Err(StateError::ConcurrencyConflict { expected, actual });
        }
        let new_version = actual + 1;
        entries.insert(key, Entry { state, version: new_version });
        Ok(new_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = InMemoryStateStore::new();
        store.save("a1", "counter", vec![1, 2]).await.unwrap();
        assert_eq!(store.load("a1", "counter").await.unwrap(), Some(vec![1, 2]));
        store.delete("a1", "counter").await.unwrap();
        assert_eq!(store.load("a1", "counter").await.unwrap(), None);
    }

    #[tokio::test]
    async fn versioned_save_with_matching_version_increments() {
        let store = InMemoryStateStore::new();
        let v1 = store.save_with_version("a1", "s", vec![1], None).await.unwrap();
        assert_eq!(v1, 1);
        let v2 = store.save_with_version("a1", "s", vec![2], Some(1)).await.unwrap();
        assert_eq!(v2, 2);
        let loaded = store.load_with_version("a1", "s").await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.state, vec![2]);
    }

    #[tokio::test]
    async fn versioned_save_with_stale_version_conflicts() {
        let store = InMemoryStateStore::new();
        store.save_with_version("a1", "s", vec![1], None).await.unwrap();
        let err = store
            .save_with_version("a1", "s", vec![2], Some(5))
            .await
            .unwrap_err();
        match err {
            StateError::ConcurrencyConflict { expected, actual } => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
