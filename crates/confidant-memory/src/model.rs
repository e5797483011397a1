//! Input/patch shapes for [`crate::memory_service::MemoryService`] and
//! [`crate::relationship_service::RelationshipService`], plus the
//! `Memory`/`Relationship` <-> `Collection` property conversions (spec §4.5,
//! §9 "discriminated entities in one collection").

use confidant_core::{DocType, Location, Memory, MemoryContext, Relationship};
use serde_json::Value;
use std::collections::HashSet;

pub struct NewMemory {
    pub content: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub tags: HashSet<String>,
    pub memory_type: String,
    pub context: MemoryContext,
    pub location: Option<Location>,
    pub references: Option<Vec<String>>,
}

/// All-`Option` patch — only supplied fields are written, matching the
/// Ghost Config partial-merge idiom used elsewhere in this workspace.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub content: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<HashSet<String>>,
    pub memory_type: Option<String>,
    pub weight: Option<f32>,
    pub trust: Option<f32>,
    pub context: Option<MemoryContext>,
    pub location: Option<Location>,
    pub references: Option<Vec<String>>,
    /// Not part of the owner-facing edit surface spec §4.5 lists for
    /// `update` — written only by C6's publication pipeline after a
    /// successful fan-out, to keep the source memory's own `space_ids`/
    /// `group_ids` in sync with where it is actually published.
    pub space_ids: Option<HashSet<String>>,
    pub group_ids: Option<HashSet<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewRelationship {
    pub related_memory_ids: Vec<String>,
    pub relationship_type: String,
    pub observation: Option<String>,
    pub strength: Option<f32>,
    pub confidence: f32,
    pub tags: HashSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipPatch {
    pub relationship_type: Option<String>,
    pub observation: Option<String>,
    pub strength: Option<f32>,
    pub confidence: Option<f32>,
    pub tags: Option<HashSet<String>>,
}

#[derive(Debug, Clone)]
pub enum DocRecord {
    Memory(Memory),
    Relationship(Relationship),
}

pub fn memory_to_properties(memory: &Memory) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(memory)?;
    value["doc_type"] = serde_json::to_value(DocType::Memory)?;
    Ok(value)
}

pub fn relationship_to_properties(relationship: &Relationship) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(relationship)?;
    value["doc_type"] = serde_json::to_value(DocType::Relationship)?;
    Ok(value)
}

pub fn parse_doc_record(properties: Value) -> anyhow::Result<DocRecord> {
    match properties.get("doc_type").and_then(Value::as_str) {
        Some("relationship") => Ok(DocRecord::Relationship(serde_json::from_value(properties)?)),
        _ => Ok(DocRecord::Memory(serde_json::from_value(properties)?)),
    }
}

pub fn parse_memory(properties: Value) -> anyhow::Result<Memory> {
    Ok(serde_json::from_value(properties)?)
}

pub fn parse_relationship(properties: Value) -> anyhow::Result<Relationship> {
    Ok(serde_json::from_value(properties)?)
}
