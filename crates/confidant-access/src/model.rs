//! Escalation state and the access-decision enum (spec §3 "Escalation
//! Record", §4.2).

use chrono::{DateTime, Utc};
use confidant_core::Memory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub blocked_at: DateTime<Utc>,
    pub reason: String,
    pub attempt_count: u32,
}

/// Per-(owner, accessor, memory) escalation bookkeeping. `count` only ever
/// increases; `resetBlock` is the sole way back to the initial state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscalationRecord {
    #[serde(default)]
    pub count: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub blocked: Option<BlockInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Owner,
    Trusted,
}

#[derive(Debug, Clone)]
pub enum AccessResult {
    Granted { access_level: AccessLevel, memory: Memory },
    NoPermission,
    Blocked { memory_id: String, reason: String, blocked_at: DateTime<Utc> },
    InsufficientTrust { memory_id: String, required: f32, actual: f32, attempts_remaining: u32 },
}
