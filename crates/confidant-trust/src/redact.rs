//! Redaction: turning a [`Memory`] plus an accessor's trust level into the
//! view that accessor is actually allowed to see (spec §4.1).

use chrono::{DateTime, Utc};
use confidant_core::Memory;
use serde::Serialize;

use crate::tier::Tier;

const EXISTENCE_NOTE: &str = "A memory exists about this topic.";
const SUMMARY_PLACEHOLDER: &str = "No summary available.";

/// What a prompt/adapter is handed back after redaction. `serde`-derived so
/// callers can serialize it directly into an LLM context block or an API
/// response without a second transformation step. Field sets per tier are
/// not cumulative (e.g. `Summary` reveals a title but not tags, `Partial`
/// reveals tags but not a summary) so every field here stays `Option` and
/// is populated only by the tier that names it.
#[derive(Debug, Clone, Serialize)]
pub struct PromptView {
    pub memory_id: String,
    pub tier: Tier,
    pub existence_note: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub memory_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub context_participants: Option<Vec<String>>,
    pub context_environment: Option<String>,
    pub context_notes: Option<String>,
    pub location_address: Option<String>,
    pub references: Option<Vec<String>>,
}

impl PromptView {
    fn bare(memory_id: &str, tier: Tier) -> Self {
        Self {
            memory_id: memory_id.to_string(),
            tier,
            existence_note: None,
            title: None,
            summary: None,
            content: None,
            tags: None,
            memory_type: None,
            created_at: None,
            context_participants: None,
            context_environment: None,
            context_notes: None,
            location_address: None,
            references: None,
        }
    }
}

/// Cross-user cap (spec §4.1): a memory whose own required trust is already
/// at the maximum (1.0) is forced to the `Existence` tier for every
/// non-owner accessor, no matter how trusted they are. Owner access always
/// bypasses both the cap and the ordinary trust-to-tier mapping.
pub fn tier_for_access(memory_trust: f32, accessor_trust: f32, is_self: bool) -> Tier {
    if is_self {
        return Tier::Full;
    }
    if memory_trust >= 1.0 {
        return Tier::Existence;
    }
    Tier::from_trust(accessor_trust)
}

/// Pure transformation — the single place the tier-to-redaction policy
/// lives (spec §9 "trust-tier formatting as pure transformation").
pub fn format_memory_for_prompt(memory: &Memory, accessor_trust: f32, is_self: bool) -> PromptView {
    let tier = tier_for_access(memory.trust, accessor_trust, is_self);
    let mut view = PromptView::bare(&memory.id, tier);

    match tier {
        Tier::Existence => {
            view.existence_note = Some(EXISTENCE_NOTE.to_string());
        }
        Tier::Metadata => {
            view.memory_type = Some(memory.memory_type.clone());
            view.tags = Some(memory.tags.iter().cloned().collect());
            view.created_at = Some(memory.created_at);
        }
        Tier::Summary => {
            view.title = memory.title.clone();
            view.summary =
                Some(memory.summary.clone().unwrap_or_else(|| SUMMARY_PLACEHOLDER.to_string()));
            view.memory_type = Some(memory.memory_type.clone());
        }
        Tier::Partial => {
            view.content = Some(memory.content.clone());
            view.title = memory.title.clone();
            view.memory_type = Some(memory.memory_type.clone());
            view.tags = Some(memory.tags.iter().cloned().collect());
        }
        Tier::Full => {
            view.content = Some(memory.content.clone());
            view.title = memory.title.clone();
            view.summary = memory.summary.clone();
            view.memory_type = Some(memory.memory_type.clone());
            view.tags = Some(memory.tags.iter().cloned().collect());
            view.created_at = Some(memory.created_at);
            view.context_participants = Some(memory.context.participants.clone());
            view.context_environment = memory.context.environment.clone();
            view.context_notes = memory.context.notes.clone();
            view.location_address = memory.location.as_ref().and_then(|l| l.address.clone());
            view.references = memory.references.clone();
        }
    }

    view
}
