//! The shared memory/relationship data model (spec §3). Lives in
//! `confidant-core` rather than the memory-service crate because the trust
//! (C1) and access-control (C2) components need to read these fields
//! without depending on the service crate that owns their storage —
//! mirroring how the teacher keeps `MemoryEntry`/`MemoryTier` as plain,
//! dependency-free structs in `crates/memory/src/schema.rs` that every
//! other module in that crate imports.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage discriminant for the shared per-user collection (spec §9
/// "discriminated entities in one collection"). Every `Collection` query
/// against that collection must filter on this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Memory,
    Relationship,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryContext {
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub owner_id: String,
    pub content: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: HashSet<String>,
    /// Categorical but open-ended (journal, note, action, event, …) —
    /// plain `String`, matching the teacher's free-form `source` field in
    /// `schema::MemoryEntry` rather than a closed enum.
    pub memory_type: String,
    pub weight: f32,
    pub trust: f32,
    #[serde(default)]
    pub context: MemoryContext,
    pub location: Option<Location>,
    pub references: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub deletion_reason: Option<String>,
    #[serde(default)]
    pub space_ids: HashSet<String>,
    #[serde(default)]
    pub group_ids: HashSet<String>,
    #[serde(default)]
    pub relationship_ids: HashSet<String>,
}

impl Memory {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub owner_id: String,
    pub related_memory_ids: Vec<String>,
    pub relationship_type: String,
    pub observation: Option<String>,
    pub strength: Option<f32>,
    pub confidence: f32,
    #[serde(default)]
    pub tags: HashSet<String>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
