//! Per-destination moderation requirement, resolved the same
//! KV-backed-provider way as [`confidant_config::GhostConfigStore`] (spec
//! §4.6 "moderation_status comes from the group's own config" / "if any
//! target space's config requires moderation"). Not named as its own
//! component in the spec's component table, but required to implement
//! `publish`'s moderation-status step — grounded on C3's provider shape
//! rather than invented from scratch.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use confidant_core::KVDocStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct DestinationConfig {
    requires_moderation: bool,
}

#[async_trait]
pub trait ModerationConfigProvider: Send + Sync {
    async fn space_requires_moderation(&self, space_id: &str) -> Result<bool>;
    async fn group_requires_moderation(&self, group_id: &str) -> Result<bool>;
}

pub struct KvModerationConfig {
    kv: Arc<dyn KVDocStore>,
}

impl KvModerationConfig {
    pub fn new(kv: Arc<dyn KVDocStore>) -> Self {
        Self { kv }
    }

    async fn requires_moderation(&self, path: &str) -> Result<bool> {
        match self.kv.get(path, "config").await? {
            Some(value) => Ok(serde_json::from_value::<DestinationConfig>(value)?.requires_moderation),
            None => Ok(false),
        }
    }

    pub async fn set_space_requires_moderation(&self, space_id: &str, requires: bool) -> Result<()> {
        let path = format!("spaces/{space_id}/config");
        self.kv.set(&path, "config", serde_json::json!({ "requires_moderation": requires }), false).await
    }

    pub async fn set_group_requires_moderation(&self, group_id: &str, requires: bool) -> Result<()> {
        let path = format!("groups/{group_id}/config");
        self.kv.set(&path, "config", serde_json::json!({ "requires_moderation": requires }), false).await
    }
}

#[async_trait]
impl ModerationConfigProvider for KvModerationConfig {
    async fn space_requires_moderation(&self, space_id: &str) -> Result<bool> {
        self.requires_moderation(&format!("spaces/{space_id}/config")).await
    }

    async fn group_requires_moderation(&self, group_id: &str) -> Result<bool> {
        self.requires_moderation(&format!("groups/{group_id}/config")).await
    }
}
