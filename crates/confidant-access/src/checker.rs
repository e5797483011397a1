//! `check_access` — the ordered, first-match-wins permission algorithm
//! (spec §4.2).

use confidant_config::GhostConfigProvider;
use confidant_core::Memory;
use confidant_trust::is_trust_sufficient;

use crate::model::{AccessLevel, AccessResult};
use crate::store::{BLOCK_THRESHOLD, EscalationStore};

pub struct AccessChecker<C: GhostConfigProvider> {
    config: C,
    escalation: EscalationStore,
}

impl<C: GhostConfigProvider> AccessChecker<C> {
    pub fn new(config: C, escalation: EscalationStore) -> Self {
        Self { config, escalation }
    }

    pub async fn check_access(&self, accessor_id: &str, memory: &Memory) -> anyhow::Result<AccessResult> {
        // 1. Owner short-circuits every other check.
        if accessor_id == memory.owner_id {
            return Ok(AccessResult::Granted { access_level: AccessLevel::Owner, memory: memory.clone() });
        }

        // 2. Ghost mode must be explicitly enabled by the owner.
        let config = match self.config.get_ghost_config(&memory.owner_id).await? {
            Some(config) if config.enabled => config,
            _ => return Ok(AccessResult::NoPermission),
        };

        // 3. A user-wide block overrides any per-memory trust the owner granted.
        if config.blocked_users.contains(accessor_id) {
            return Ok(AccessResult::NoPermission);
        }

        // 4. A standing per-memory block is terminal until `resetBlock`.
        let record = self.escalation.load(&memory.owner_id, accessor_id, &memory.id).await?;
        if let Some(blocked) = &record.blocked {
            return Ok(AccessResult::Blocked {
                memory_id: memory.id.clone(),
                reason: blocked.reason.clone(),
                blocked_at: blocked.blocked_at,
            });
        }

        // 5. Resolve the accessor's effective trust for this owner.
        let accessor_trust = config.effective_trust(accessor_id);

        // 6. Trust gate — insufficient trust escalates the attempt count.
        if !is_trust_sufficient(memory.trust, accessor_trust) {
            let updated =
                self.escalation.record_attempt(&memory.owner_id, accessor_id, &memory.id, record).await;
            return Ok(match &updated.blocked {
                Some(blocked) => AccessResult::Blocked {
                    memory_id: memory.id.clone(),
                    reason: blocked.reason.clone(),
                    blocked_at: blocked.blocked_at,
                },
                None => AccessResult::InsufficientTrust {
                    memory_id: memory.id.clone(),
                    required: memory.trust,
                    actual: (accessor_trust - 0.1).max(0.0),
                    attempts_remaining: BLOCK_THRESHOLD - updated.count,
                },
            });
        }

        // 7. All checks passed.
        Ok(AccessResult::Granted { access_level: AccessLevel::Trusted, memory: memory.clone() })
    }

    pub async fn reset_block(&self, owner_id: &str, accessor_id: &str, memory_id: &str) -> anyhow::Result<()> {
        self.escalation.reset_block(owner_id, accessor_id, memory_id).await
    }
}
