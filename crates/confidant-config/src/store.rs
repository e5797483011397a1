//! `GhostConfigStore` — CRUD and partial-merge over [`GhostConfig`] via a
//! [`KVDocStore`], at the KV path spec §6 lays out:
//! `{BASE}.users/{owner}/ghost_config/settings`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use confidant_core::KVDocStore;
use tracing::info;

use crate::model::{GhostConfig, GhostConfigPatch};

const DOC_ID: &str = "settings";

/// Interface consumed by C2 (access control): `getGhostConfig(owner) ->
/// config | null` where `None` signals "ghost disabled" identically to
/// `enabled = false` (spec §4.3).
#[async_trait]
pub trait GhostConfigProvider: Send + Sync {
    async fn get_ghost_config(&self, owner_id: &str) -> Result<Option<GhostConfig>>;
}

pub struct GhostConfigStore {
    kv: Arc<dyn KVDocStore>,
    base: String,
}

impl GhostConfigStore {
    pub fn new(kv: Arc<dyn KVDocStore>) -> Self {
        Self { kv, base: String::new() }
    }

    /// Namespaces every path under `{base}.users/...`, matching the `{BASE}`
    /// placeholder in spec §6's path template.
    pub fn with_base(kv: Arc<dyn KVDocStore>, base: impl Into<String>) -> Self {
        Self { kv, base: base.into() }
    }

    fn path(&self, owner_id: &str) -> String {
        if self.base.is_empty() {
            format!("users/{owner_id}/ghost_config")
        } else {
            format!("{}.users/{owner_id}/ghost_config", self.base)
        }
    }

    pub async fn set_ghost_config(&self, owner_id: &str, config: GhostConfig) -> Result<()> {
        config.validate()?;
        let path = self.path(owner_id);
        self.kv.set(&path, DOC_ID, serde_json::to_value(&config)?, false).await?;
        info!(owner = owner_id, "ghost config replaced");
        Ok(())
    }

    pub async fn update_ghost_config(&self, owner_id: &str, patch: GhostConfigPatch) -> Result<GhostConfig> {
        let mut config = self.get_ghost_config(owner_id).await?.unwrap_or_default();
        patch.apply_to(&mut config);
        // Validate before persisting — an invalid field fails with no change
        // persisted (spec §4.3).
        config.validate()?;

        let touched = patch.touched_fields();
        let path = self.path(owner_id);
        self.kv.set(&path, DOC_ID, serde_json::to_value(&config)?, false).await?;
        info!(owner = owner_id, fields = ?touched, "ghost config updated");
        Ok(config)
    }

    pub async fn delete_ghost_config(&self, owner_id: &str) -> Result<()> {
        let path = self.path(owner_id);
        self.kv.delete(&path, DOC_ID).await?;
        info!(owner = owner_id, "ghost config deleted");
        Ok(())
    }
}

#[async_trait]
impl GhostConfigProvider for GhostConfigStore {
    async fn get_ghost_config(&self, owner_id: &str) -> Result<Option<GhostConfig>> {
        let path = self.path(owner_id);
        match self.kv.get(&path, DOC_ID).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}
