//! `CredentialsProvider` — resolves an opaque access token into the caller's
//! identity and group memberships (spec §6), used by C6's moderation and
//! write-ACL checks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Permissions {
    pub can_revise: bool,
    pub can_overwrite: bool,
    pub can_moderate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group_id: String,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: String,
    pub group_memberships: Vec<GroupMembership>,
}

impl AuthContext {
    pub fn permissions_in(&self, group_id: &str) -> Option<&Permissions> {
        self.group_memberships
            .iter()
            .find(|m| m.group_id == group_id)
            .map(|m| &m.permissions)
    }

    pub fn can_revise_in(&self, group_id: &str) -> bool {
        self.permissions_in(group_id).map(|p| p.can_revise).unwrap_or(false)
    }

    pub fn can_overwrite_in(&self, group_id: &str) -> bool {
        self.permissions_in(group_id).map(|p| p.can_overwrite).unwrap_or(false)
    }

    pub fn can_moderate_in(&self, group_id: &str) -> bool {
        self.permissions_in(group_id).map(|p| p.can_moderate).unwrap_or(false)
    }

    pub fn can_moderate_any(&self) -> bool {
        self.group_memberships.iter().any(|m| m.permissions.can_moderate)
    }
}

#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> anyhow::Result<AuthContext>;
}
