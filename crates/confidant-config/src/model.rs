//! Per-owner ghost-mode configuration (spec §3 "Ghost Config", §4.3).

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    Query,
    Prompt,
    Hybrid,
}

/// Following `crates/config`'s `#[serde(default)]` + `Default` idiom so a
/// partially-specified document (e.g. loaded before a new field existed)
/// deserializes with sane values instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostConfig {
    pub enabled: bool,
    pub default_friend_trust: f32,
    pub default_public_trust: f32,
    pub per_user_trust: HashMap<String, f32>,
    pub blocked_users: HashSet<String>,
    pub enforcement_mode: EnforcementMode,
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_friend_trust: 0.5,
            default_public_trust: 0.0,
            per_user_trust: HashMap::new(),
            blocked_users: HashSet::new(),
            // No social-graph predicate is wired in (spec §9 "friend-vs-public
            // discrimination is a deliberate gap"), so `hybrid` is the safest
            // default: it still redacts everything but trust=0 without
            // requiring the owner to pick a mode explicitly.
            enforcement_mode: EnforcementMode::Hybrid,
        }
    }
}

impl GhostConfig {
    pub fn validate(&self) -> Result<()> {
        validate_trust("default_friend_trust", self.default_friend_trust)?;
        validate_trust("default_public_trust", self.default_public_trust)?;
        for (accessor, trust) in &self.per_user_trust {
            validate_trust(&format!("per_user_trust[{accessor}]"), *trust)?;
        }
        Ok(())
    }

    /// Resolve the accessor's effective trust per spec §4.2 step 5:
    /// `per_user_trust[accessor]` if present, else `default_public_trust`.
    /// `default_friend_trust` is intentionally unreachable here — see
    /// [`EnforcementMode`] docs and spec §9's "deliberate gap" note; a
    /// future social-graph predicate would be threaded in as an extra
    /// parameter to this function, not by changing this fallthrough.
    pub fn effective_trust(&self, accessor_id: &str) -> f32 {
        self.per_user_trust.get(accessor_id).copied().unwrap_or(self.default_public_trust)
    }
}

fn validate_trust(field: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("Invalid trust value for {field}: {value} (must be within [0, 1])");
    }
    Ok(())
}

/// Partial update — every field is optional so `update_ghost_config` only
/// touches what the caller supplied, mirroring spec §4.3's partial-merge
/// semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GhostConfigPatch {
    pub enabled: Option<bool>,
    pub default_friend_trust: Option<f32>,
    pub default_public_trust: Option<f32>,
    pub per_user_trust: Option<HashMap<String, f32>>,
    pub blocked_users: Option<HashSet<String>>,
    pub enforcement_mode: Option<EnforcementMode>,
}

impl GhostConfigPatch {
    /// Names of the fields this patch actually touches, for the audit log.
    pub fn touched_fields(&self) -> Vec<&'static str> {
        let mut touched = Vec::new();
        if self.enabled.is_some() {
            touched.push("enabled");
        }
        if self.default_friend_trust.is_some() {
            touched.push("default_friend_trust");
        }
        if self.default_public_trust.is_some() {
            touched.push("default_public_trust");
        }
        if self.per_user_trust.is_some() {
            touched.push("per_user_trust");
        }
        if self.blocked_users.is_some() {
            touched.push("blocked_users");
        }
        if self.enforcement_mode.is_some() {
            touched.push("enforcement_mode");
        }
        touched
    }

    pub fn apply_to(&self, base: &mut GhostConfig) {
        if let Some(enabled) = self.enabled {
            base.enabled = enabled;
        }
        if let Some(trust) = self.default_friend_trust {
            base.default_friend_trust = trust;
        }
        if let Some(trust) = self.default_public_trust {
            base.default_public_trust = trust;
        }
        if let Some(per_user) = &self.per_user_trust {
            base.per_user_trust = per_user.clone();
        }
        if let Some(blocked) = &self.blocked_users {
            base.blocked_users = blocked.clone();
        }
        if let Some(mode) = self.enforcement_mode {
            base.enforcement_mode = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_disabled_and_valid() {
        let config = GhostConfig::default();
        assert!(!config.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_trust() {
        let mut config = GhostConfig::default();
        config.default_public_trust = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn effective_trust_prefers_per_user_override() {
        let mut config = GhostConfig::default();
        config.default_public_trust = 0.1;
        config.per_user_trust.insert("u2".to_string(), 0.9);
        assert_eq!(config.effective_trust("u2"), 0.9);
        assert_eq!(config.effective_trust("u3"), 0.1);
    }

    #[test]
    fn patch_touches_only_supplied_fields() {
        let patch = GhostConfigPatch { enabled: Some(true), ..Default::default() };
        assert_eq!(patch.touched_fields(), vec!["enabled"]);
        let mut config = GhostConfig::default();
        patch.apply_to(&mut config);
        assert!(config.enabled);
        assert_eq!(config.default_public_trust, 0.0);
    }
}
