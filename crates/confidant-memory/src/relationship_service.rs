//! `RelationshipService` — CRUD for relationship rows linking two or more
//! memories (spec §4.5 "Relationships").

use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::Utc;
use confidant_core::{Collection, DocType, FilterExpr, QueryOptions, Relationship, and, by_property};
use uuid::Uuid;

use crate::model::{NewRelationship, RelationshipPatch, parse_memory, parse_relationship, relationship_to_properties};

pub struct RelationshipService {
    collection: Arc<dyn Collection>,
    user_id: String,
}

impl RelationshipService {
    pub fn new(collection: Arc<dyn Collection>, user_id: impl Into<String>) -> Self {
        Self { collection, user_id: user_id.into() }
    }

    /// Validates every referenced memory exists, belongs to the owner, is
    /// not soft-deleted, and has `doc_type = memory`; then links each
    /// connected memory's `relationship_ids` to the new row. Validation
    /// runs before any write so a rejected relationship leaves no partial
    /// state (spec §8 "atomically").
    pub async fn create(&self, input: NewRelationship) -> Result<Relationship> {
        if input.related_memory_ids.len() < 2 {
            bail!("A relationship requires at least 2 related memory ids");
        }
        if !(0.0..=1.0).contains(&input.confidence) {
            bail!("Invalid confidence value: {} (must be within [0, 1])", input.confidence);
        }
        if let Some(strength) = input.strength {
            if !(0.0..=1.0).contains(&strength) {
                bail!("Invalid strength value: {strength} (must be within [0, 1])");
            }
        }

        let mut members = Vec::with_capacity(input.related_memory_ids.len());
        for memory_id in &input.related_memory_ids {
            let object = self
                .collection
                .fetch_by_id(memory_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Memory not found: {memory_id}"))?;
            let memory = parse_memory(object.properties)?;
            if memory.owner_id != self.user_id {
                bail!("Permission denied: not memory owner");
            }
            if memory.is_deleted() {
                bail!("Memory not found: {memory_id}");
            }
            members.push(memory);
        }

        let now = Utc::now();
        let relationship = Relationship {
            id: Uuid::new_v4().to_string(),
            owner_id: self.user_id.clone(),
            related_memory_ids: input.related_memory_ids.clone(),
            relationship_type: input.relationship_type,
            observation: input.observation,
            strength: input.strength,
            confidence: input.confidence,
            tags: input.tags,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.collection
            .insert(Some(relationship.id.clone()), relationship_to_properties(&relationship)?)
            .await?;

        for mut memory in members {
            memory.relationship_ids.insert(relationship.id.clone());
            self.collection
                .update(&memory.id, crate::model::memory_to_properties(&memory)?)
                .await?;
        }

        Ok(relationship)
    }

    async fn fetch_owned(&self, relationship_id: &str) -> Result<Relationship> {
        let object = self
            .collection
            .fetch_by_id(relationship_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Relationship not found: {relationship_id}"))?;
        let relationship = parse_relationship(object.properties)?;
        if relationship.owner_id != self.user_id {
            bail!("Permission denied: not relationship owner");
        }
        Ok(relationship)
    }

    /// Removes the row and strips its id from every connected memory's
    /// `relationship_ids`.
    pub async fn delete(&self, relationship_id: &str) -> Result<()> {
        let relationship = self.fetch_owned(relationship_id).await?;
        self.collection.delete_by_id(relationship_id).await?;

        for memory_id in &relationship.related_memory_ids {
            if let Some(object) = self.collection.fetch_by_id(memory_id).await? {
                let mut memory = parse_memory(object.properties)?;
                memory.relationship_ids.remove(relationship_id);
                self.collection.update(&memory.id, crate::model::memory_to_properties(&memory)?).await?;
            }
        }
        Ok(())
    }

    pub async fn update(&self, relationship_id: &str, patch: RelationshipPatch) -> Result<Vec<String>> {
        let mut relationship = self.fetch_owned(relationship_id).await?;
        let mut changed = Vec::new();

        if let Some(strength) = patch.strength {
            if !(0.0..=1.0).contains(&strength) {
                bail!("Invalid strength value: {strength} (must be within [0, 1])");
            }
            relationship.strength = Some(strength);
            changed.push("strength");
        }
        if let Some(confidence) = patch.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                bail!("Invalid confidence value: {confidence} (must be within [0, 1])");
            }
            relationship.confidence = confidence;
            changed.push("confidence");
        }
        if let Some(relationship_type) = patch.relationship_type {
            relationship.relationship_type = relationship_type;
            changed.push("relationship_type");
        }
        if let Some(observation) = patch.observation {
            relationship.observation = Some(observation);
            changed.push("observation");
        }
        if let Some(tags) = patch.tags {
            relationship.tags = tags;
            changed.push("tags");
        }

        if changed.is_empty() {
            return Ok(Vec::new());
        }

        relationship.updated_at = Utc::now();
        relationship.version += 1;
        self.collection.update(&relationship.id, relationship_to_properties(&relationship)?).await?;
        Ok(changed.into_iter().map(str::to_string).collect())
    }

    /// `search` — filters on `doc_type = relationship`, supports
    /// type-OR, strength/confidence floors, and tag ANY via the caller's
    /// own filter expression.
    pub async fn search(&self, filters: Option<FilterExpr>) -> Result<Vec<Relationship>> {
        let mut clauses = vec![
            by_property("doc_type").equal(serde_json::json!(DocType::Relationship)),
            by_property("owner_id").equal(serde_json::json!(self.user_id)),
        ];
        if let Some(filters) = filters {
            clauses.push(filters);
        }
        let opts = QueryOptions::default().with_filters(and(clauses));
        let objects = self.collection.hybrid("", opts).await?;
        objects.into_iter().map(|obj| parse_relationship(obj.properties)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use confidant_core::testing::InMemoryCollection;
    use confidant_core::MemoryContext;

    use super::*;
    use crate::memory_service::MemoryService;
    use crate::model::NewMemory;

    fn new_memory(content: &str) -> NewMemory {
        NewMemory {
            content: content.to_string(),
            title: None,
            summary: None,
            tags: HashSet::new(),
            memory_type: "note".to_string(),
            context: MemoryContext::default(),
            location: None,
            references: None,
        }
    }

    #[tokio::test]
    async fn create_requires_at_least_two_members() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let memories = MemoryService::new(collection.clone(), "u1");
        let relationships = RelationshipService::new(collection, "u1");
        let m1 = memories.create(new_memory("a")).await.unwrap();

        let result = relationships
            .create(NewRelationship {
                related_memory_ids: vec![m1.id],
                relationship_type: "related_to".to_string(),
                observation: None,
                strength: None,
                confidence: 0.5,
                tags: HashSet::new(),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn create_links_back_to_every_member() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let memories = MemoryService::new(collection.clone(), "u1");
        let relationships = RelationshipService::new(collection, "u1");
        let m1 = memories.create(new_memory("a")).await.unwrap();
        let m2 = memories.create(new_memory("b")).await.unwrap();

        let relationship = relationships
            .create(NewRelationship {
                related_memory_ids: vec![m1.id.clone(), m2.id.clone()],
                relationship_type: "related_to".to_string(),
                observation: None,
                strength: None,
                confidence: 0.9,
                tags: HashSet::new(),
            })
            .await
            .unwrap();

        let reloaded_m1 = memories.fetch_owned(&m1.id).await.unwrap();
        assert!(reloaded_m1.relationship_ids.contains(&relationship.id));
    }

    #[tokio::test]
    async fn delete_strips_id_from_connected_memories() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let memories = MemoryService::new(collection.clone(), "u1");
        let relationships = RelationshipService::new(collection, "u1");
        let m1 = memories.create(new_memory("a")).await.unwrap();
        let m2 = memories.create(new_memory("b")).await.unwrap();
        let relationship = relationships
            .create(NewRelationship {
                related_memory_ids: vec![m1.id.clone(), m2.id.clone()],
                relationship_type: "related_to".to_string(),
                observation: None,
                strength: None,
                confidence: 0.9,
                tags: HashSet::new(),
            })
            .await
            .unwrap();

        relationships.delete(&relationship.id).await.unwrap();
        let reloaded_m1 = memories.fetch_owned(&m1.id).await.unwrap();
        assert!(!reloaded_m1.relationship_ids.contains(&relationship.id));
    }
}
