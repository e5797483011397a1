//! Published-memory row shape, moderation status, write-ACL modes, and
//! revision history (spec §3 "Revision Entry", §4.6).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use confidant_core::DocType;
use serde::{Deserialize, Serialize};

pub const MAX_REVISION_HISTORY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    OwnerOnly,
    GroupEditors,
    Anyone,
}

impl Default for WriteMode {
    fn default() -> Self {
        // spec §4.6 "Default write_mode is owner_only when unspecified."
        WriteMode::OwnerOnly
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Reject,
    Remove,
}

impl ModerationAction {
    pub fn resulting_status(self) -> ModerationStatus {
        match self {
            ModerationAction::Approve => ModerationStatus::Approved,
            ModerationAction::Reject => ModerationStatus::Rejected,
            ModerationAction::Remove => ModerationStatus::Removed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionEntry {
    pub content: String,
    pub revised_at: DateTime<Utc>,
}

/// One row in either the unified public-spaces collection or a single
/// group's dedicated collection, addressed by [`crate::id::composite_id`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedMemory {
    pub id: String,
    pub doc_type: DocType,
    pub source_owner_id: String,
    /// Who actually wrote the row's current content — equal to
    /// `source_owner_id` until a non-owner revise under `write_mode =
    /// group_editors`/`anyone` lands (spec.md:52 lists `author_id` as
    /// distinct from `owner_id`).
    pub author_id: String,
    pub source_memory_id: String,
    pub content: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub memory_type: String,
    #[serde(default)]
    pub tags: HashSet<String>,
    pub content_type: Option<String>,
    pub weight: f32,
    /// Populated (non-empty) only on rows living in the unified spaces
    /// collection; a group-collection row's membership is implicit in
    /// which collection it lives in.
    #[serde(default)]
    pub space_ids: HashSet<String>,
    pub group_id: Option<String>,
    pub moderation_status: ModerationStatus,
    pub moderated_by: Option<String>,
    pub moderated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub write_mode: WriteMode,
    #[serde(default)]
    pub overwrite_allowed_ids: HashSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub retracted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revision_history: Vec<RevisionEntry>,
    #[serde(default)]
    pub revision_count: u32,
}

impl PublishedMemory {
    /// Prepend an old-content snapshot and truncate to the bounded
    /// history length (spec §8 invariant 6).
    pub fn push_revision(&mut self, old_content: String, revised_at: DateTime<Utc>) {
        self.revision_history.insert(0, RevisionEntry { content: old_content, revised_at });
        self.revision_history.truncate(MAX_REVISION_HISTORY);
        self.revision_count += 1;
    }
}

#[derive(Debug, Clone)]
pub enum Destination {
    Space(String),
    Group(String),
}

impl Destination {
    pub fn label(&self) -> String {
        match self {
            Destination::Space(id) => format!("space:{id}"),
            Destination::Group(id) => format!("group:{id}"),
        }
    }
}

/// `Skipped` covers revise's "no published copy at this destination" case,
/// which is neither a failure worth surfacing as an error nor a change that
/// happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct DestinationOutcome {
    pub destination: Destination,
    pub status: OutcomeStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PublicationOutcome {
    pub outcomes: Vec<DestinationOutcome>,
}

impl PublicationOutcome {
    pub fn any_succeeded(&self) -> bool {
        self.outcomes.iter().any(|o| o.status == OutcomeStatus::Success)
    }
}
