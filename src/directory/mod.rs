//! Actor directory: cluster-wide `(type,id) -> silo` mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::membership::{ClusterStore, StoreError};
use crate::util::{composite_key, SiloId};

const DIRECTORY_PREFIX: &str = "directory/";

/// A registered activation location, with the TTL it was written under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorLocation {
    pub silo_id: SiloId,
    pub registered_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

/// Backed by the cluster store; the router layers a short-TTL cache on
/// top of this.
pub struct ActorDirectory {
    store: Arc<dyn ClusterStore>,
    default_ttl: Duration,
}

impl ActorDirectory {
    pub fn new(store: Arc<dyn ClusterStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    fn key(actor_type: &str, actor_id: &str) -> String {
        format!("{DIRECTORY_PREFIX}{}", composite_key(actor_type, actor_id))
    }

    pub async fn register(&self, actor_type: &str, actor_id: &str, silo_id: SiloId) -> Result<(), StoreError> {
        let location = ActorLocation {
            silo_id,
            registered_at: Utc::now(),
            ttl_secs: self.default_ttl.as_secs(),
        };
        let bytes = serde_json::to_vec(&location).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.store
            .put(&Self::key(actor_type, actor_id), bytes, Some(self.default_ttl))
            .await
    }

    pub async fn lookup(&self, actor_type: &str, actor_id: &str) -> Result<Option<ActorLocation>, StoreError> {
        let bytes = self.store.get(&Self::key(actor_type, actor_id)).await?;
        match bytes {
            Some(bytes) => {
                let location: ActorLocation =
                    serde_json::from_slice(&bytes).map_err(|e| StoreError::Unavailable(e.to_string()))?;
                Ok(Some(location))
            }
            None => Ok(None),
        }
    }

    pub async fn deregister(&self, actor_type: &str, actor_id: &str) -> Result<(), StoreError> {
        self.store.delete(&Self::key(actor_type, actor_id)).await
    }
}
