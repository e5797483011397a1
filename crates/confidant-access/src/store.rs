//! `EscalationStore` — the escalation-record half of C2, over a
//! [`KVDocStore`] at `{BASE}.users/{owner}/ghost_escalation/{accessor}:{memory}`
//! (spec §6).

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use confidant_core::KVDocStore;
use tracing::warn;

use crate::model::{BlockInfo, EscalationRecord};

/// Consecutive insufficient-trust accesses tolerated before a block is set
/// (spec §4.2 step 6, §3 "count ≥ 3").
pub const BLOCK_THRESHOLD: u32 = 3;

pub struct EscalationStore {
    kv: Arc<dyn KVDocStore>,
    base: String,
}

impl EscalationStore {
    pub fn new(kv: Arc<dyn KVDocStore>) -> Self {
        Self { kv, base: String::new() }
    }

    pub fn with_base(kv: Arc<dyn KVDocStore>, base: impl Into<String>) -> Self {
        Self { kv, base: base.into() }
    }

    fn path(&self, owner_id: &str) -> String {
        if self.base.is_empty() {
            format!("users/{owner_id}/ghost_escalation")
        } else {
            format!("{}.users/{owner_id}/ghost_escalation", self.base)
        }
    }

    fn doc_id(accessor_id: &str, memory_id: &str) -> String {
        format!("{accessor_id}:{memory_id}")
    }

    pub async fn load(&self, owner_id: &str, accessor_id: &str, memory_id: &str) -> Result<EscalationRecord> {
        let path = self.path(owner_id);
        let id = Self::doc_id(accessor_id, memory_id);
        match self.kv.get(&path, &id).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(EscalationRecord::default()),
        }
    }

    async fn persist(
        &self,
        owner_id: &str,
        accessor_id: &str,
        memory_id: &str,
        record: &EscalationRecord,
    ) -> Result<()> {
        let path = self.path(owner_id);
        let id = Self::doc_id(accessor_id, memory_id);
        self.kv.set(&path, &id, serde_json::to_value(record)?, false).await
    }

    /// Record one more insufficient-trust attempt. Returns the record's
    /// post-increment block, if the threshold was just crossed — the
    /// caller maps this into `AccessResult::Blocked` vs `InsufficientTrust`.
    /// Escalation bookkeeping is best-effort: a backing-store failure here
    /// is logged, never surfaced, per spec §7 ("must never mask a
    /// successful access decision" — equally, it must never turn a denial
    /// into a crash).
    pub async fn record_attempt(
        &self,
        owner_id: &str,
        accessor_id: &str,
        memory_id: &str,
        mut record: EscalationRecord,
    ) -> EscalationRecord {
        record.count += 1;
        record.last_attempt_at = Some(Utc::now());
        if record.count >= BLOCK_THRESHOLD {
            record.blocked = Some(BlockInfo {
                blocked_at: Utc::now(),
                reason: format!("Access blocked after {} unauthorized attempts", record.count),
                attempt_count: record.count,
            });
        }
        if let Err(err) = self.persist(owner_id, accessor_id, memory_id, &record).await {
            warn!(owner = owner_id, accessor = accessor_id, memory = memory_id, error = %err, "failed to persist escalation record");
        }
        record
    }

    /// `resetBlock` — the only way back to the initial state (spec §4.2
    /// state machine).
    pub async fn reset_block(&self, owner_id: &str, accessor_id: &str, memory_id: &str) -> Result<()> {
        let path = self.path(owner_id);
        let id = Self::doc_id(accessor_id, memory_id);
        self.kv.delete(&path, &id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confidant_core::testing::InMemoryKVStore;

    fn store() -> EscalationStore {
        EscalationStore::new(Arc::new(InMemoryKVStore::new()))
    }

    #[tokio::test]
    async fn missing_record_loads_as_default() {
        let store = store();
        let record = store.load("u1", "u2", "m1").await.unwrap();
        assert_eq!(record.count, 0);
        assert!(record.blocked.is_none());
    }

    #[tokio::test]
    async fn third_attempt_sets_a_block() {
        let store = store();
        let mut record = EscalationRecord::default();
        record = store.record_attempt("u1", "u2", "m1", record).await;
        assert_eq!(record.count, 1);
        assert!(record.blocked.is_none());
        record = store.record_attempt("u1", "u2", "m1", record).await;
        assert!(record.blocked.is_none());
        record = store.record_attempt("u1", "u2", "m1", record).await;
        assert!(record.blocked.is_some());
        assert_eq!(record.blocked.unwrap().reason, "Access blocked after 3 unauthorized attempts");
    }

    #[tokio::test]
    async fn reset_block_clears_persisted_state() {
        let store = store();
        let mut record = EscalationRecord::default();
        for _ in 0..3 {
            record = store.record_attempt("u1", "u2", "m1", record).await;
        }
        store.reset_block("u1", "u2", "m1").await.unwrap();
        let reloaded = store.load("u1", "u2", "m1").await.unwrap();
        assert_eq!(reloaded.count, 0);
    }
}
