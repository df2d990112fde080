//! Cluster store contract: keyed records with TTL, shared by all
//! components co-hosted in the same process to avoid duplicate subscriptions.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A single change observed on the store: a key was upserted or removed.
#[derive(Debug, Clone)]
pub enum StoreChange {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

/// External collaborator contract. Membership, the actor directory and
/// reminders all share one `ClusterStore` per process to avoid duplicate
/// subscriptions. Concrete implementations (Redis, in-memory) live
/// outside this crate; the core only consumes this trait.
#[async_trait]
pub trait ClusterStore: Send + Sync + 'static {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Poll-based change feed; implementations without native pub/sub can
    /// satisfy this by diffing successive `scan_prefix` calls.
    async fn poll_changes(&self, prefix: &str, since: Option<DateTimeMarker>) -> Result<(Vec<StoreChange>, DateTimeMarker), StoreError>;
}

/// Opaque cursor for `poll_changes`. Concrete stores may encode a
/// revision number, timestamp, or cursor token here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTimeMarker(pub i64);

/// In-memory `ClusterStore` used by tests and as a reference implementation.
pub mod in_memory {
    use super::*;
    use chrono::Utc;
    use dashmap::DashMap;

    struct Entry {
        value: Vec<u8>,
        expires_at: Option<chrono::DateTime<Utc>>,
        updated_at_millis: i64,
    }

    #[derive(Default)]
    pub struct InMemoryClusterStore {
        entries: DashMap<String, Entry>,
    }

    impl InMemoryClusterStore {
        pub fn new() -> Self {
            Self::default()
        }

        fn is_expired(entry: &Entry) -> bool {
            entry
                .expires_at
                .map(|exp| Utc::now() > exp)
                .unwrap_or(false)
        }
    }

    #[async_trait]
    impl ClusterStore for InMemoryClusterStore {
        async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), StoreError> {
            let expires_at = ttl.map(|d| Utc::now() + chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero()));
            self.entries.insert(
                key.to_string(),
                Entry {
                    value,
                    expires_at,
                    updated_at_millis: Utc::now().timestamp_millis(),
                },
            );
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            match self.entries.get(key) {
                Some(entry) if !Self::is_expired(&entry) => Ok(Some(entry.value.clone())),
                Some(_) => {
                    self.entries.remove(key);
                    Ok(None)
                }
                None => Ok(None),
            }
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.entries.remove(key);
            Ok(())
        }

        async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
            let mut out = Vec::new();
            for entry in self.entries.iter() {
                if entry.key().starts_with(prefix) && !Self::is_expired(entry.value()) {
                    out.push((entry.key().clone(), entry.value().value.clone()));
                }
            }
            Ok(out)
        }

        async fn poll_changes(
            &self,
            prefix: &str,
            since: Option<DateTimeMarker>,
        ) -> Result<(Vec<StoreChange>, DateTimeMarker), StoreError> {
            let since_millis = since.map(|m| m.0).unwrap_or(0);
            let mut changes = Vec::new();
            let mut max_seen = since_millis;
            for entry in self.entries.iter() {
                if entry.key().starts_with(prefix) && entry.value().updated_at_millis > since_millis {
                    max_seen = max_seen.max(entry.value().updated_at_millis);
                    if Self::is_expired(entry.value()) {
                        changes.push(StoreChange::Delete { key: entry.key().clone() });
                    } else {
                        changes.push(StoreChange::Put {
                            key: entry.key().clone(),
                            value: entry.value().value.clone(),
                        });
                    }
                }
            }
            Ok((changes, DateTimeMarker(max_seen)))
        }
    }

}
