//! Silo registration record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::util::SiloId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiloStatus {
    Joining,
    Active,
    Draining,
    Dead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiloInfo {
    pub silo_id: SiloId,
    pub address: String,
    pub port: u16,
    pub status: SiloStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub actor_type_versions: HashMap<String, String>,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub shard_group: Option<String>,
}

impl SiloInfo {
    pub fn new(silo_id: SiloId, address: impl Into<String>, port: u16) -> Self {
        Self {
            silo_id,
            address: address.into(),
            port,
            status: SiloStatus::Joining,
            last_heartbeat: Utc::now(),
            actor_type_versions: HashMap::new(),
            region: None,
            zone: None,
            shard_group: None,
        }
    }

    pub fn storage_key(&self) -> String {
        format!("cluster/silo/{}", self.silo_id)
    }
}
