//! `MemoryService` — owner-scoped CRUD and search over the per-user
//! collection (spec §4.5 / C5).

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::Utc;
use confidant_core::{Collection, DocType, FilterExpr, Memory, QueryOptions, and, by_property};
use uuid::Uuid;

use crate::model::{DocRecord, MemoryPatch, NewMemory, memory_to_properties, parse_doc_record, parse_memory};

pub struct DeleteOutcome {
    pub memory_id: String,
    pub orphaned_relationship_ids: Vec<String>,
}

pub struct MemoryService {
    collection: Arc<dyn Collection>,
    user_id: String,
}

impl MemoryService {
    pub fn new(collection: Arc<dyn Collection>, user_id: impl Into<String>) -> Self {
        Self { collection, user_id: user_id.into() }
    }

    fn own_memory_clauses(&self) -> Vec<FilterExpr> {
        vec![
            by_property("doc_type").equal(serde_json::json!(DocType::Memory)),
            by_property("owner_id").equal(serde_json::json!(self.user_id)),
            by_property("deleted_at").is_null(),
        ]
    }

    /// `create(input)` — spec §4.5 defaults: `version = 1`, `weight =
    /// trust = 0.5`, timestamps set to now.
    pub async fn create(&self, input: NewMemory) -> Result<Memory> {
        let now = Utc::now();
        let memory = Memory {
            id: Uuid::new_v4().to_string(),
            owner_id: self.user_id.clone(),
            content: input.content,
            title: input.title,
            summary: input.summary,
            tags: input.tags,
            memory_type: input.memory_type,
            weight: 0.5,
            trust: 0.5,
            context: input.context,
            location: input.location,
            references: input.references,
            created_at: now,
            updated_at: now,
            version: 1,
            deleted_at: None,
            deleted_by: None,
            deletion_reason: None,
            space_ids: HashSet::new(),
            group_ids: HashSet::new(),
            relationship_ids: HashSet::new(),
        };
        self.collection.insert(Some(memory.id.clone()), memory_to_properties(&memory)?).await?;
        Ok(memory)
    }

    /// Fetch a memory owned by this service's user, erroring on a memory
    /// not found or owned by someone else. Used directly by callers (e.g.
    /// C6 re-fetching the source memory before fan-out) as well as by
    /// `update`/`delete` above.
    pub async fn get(&self, memory_id: &str) -> Result<Memory> {
        self.fetch_owned(memory_id).await
    }

    pub(crate) async fn fetch_owned(&self, memory_id: &str) -> Result<Memory> {
        let object = self
            .collection
            .fetch_by_id(memory_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Memory not found: {memory_id}"))?;
        let memory = parse_memory(object.properties)?;
        if memory.owner_id != self.user_id {
            bail!("Permission denied: not memory owner");
        }
        Ok(memory)
    }

    /// `search(query, filters, include_relationships)`. Tags in `filters`
    /// use AND semantics across tag filters (spec §4.5) — the caller
    /// supplies that already-ANDed clause; this method only adds the
    /// ownership/doc-type/not-deleted predicates.
    pub async fn search(
        &self,
        query: &str,
        filters: Option<FilterExpr>,
        include_relationships: bool,
    ) -> Result<Vec<DocRecord>> {
        let doc_type_clause = if include_relationships {
            confidant_core::or(vec![
                by_property("doc_type").equal(serde_json::json!(DocType::Memory)),
                by_property("doc_type").equal(serde_json::json!(DocType::Relationship)),
            ])
        } else {
            by_property("doc_type").equal(serde_json::json!(DocType::Memory))
        };

        let mut clauses = vec![doc_type_clause, by_property("owner_id").equal(serde_json::json!(self.user_id))];
        if !include_relationships {
            clauses.push(by_property("deleted_at").is_null());
        }
        if let Some(filters) = filters {
            clauses.push(filters);
        }

        let opts = QueryOptions::default().with_filters(and(clauses));
        let objects = self.collection.hybrid(query, opts).await?;
        objects.into_iter().map(|obj| parse_doc_record(obj.properties)).collect()
    }

    /// `findSimilar(memory_id, limit, min_similarity)`. The `Collection`
    /// boundary never exposes a stored embedding to fetch "the source
    /// memory's vector" by (embedding generation is out of scope), so this
    /// uses `near_text` against the source's own content as the closest
    /// available analogue to a vector-similarity search.
    pub async fn find_similar(
        &self,
        memory_id: &str,
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<(Memory, f32)>> {
        let source = self.fetch_owned(memory_id).await?;
        let mut clauses = self.own_memory_clauses();
        clauses.push(by_property("id").not_equal(serde_json::json!(source.id)));
        let opts = QueryOptions::default().with_filters(and(clauses)).with_limit(limit);
        let objects = self.collection.near_text(&source.content, opts).await?;

        objects
            .into_iter()
            .map(|obj| {
                let similarity = obj.score.or(obj.distance).unwrap_or(0.0);
                Ok((parse_memory(obj.properties)?, similarity))
            })
            .collect::<Result<Vec<_>>>()
            .map(|results| results.into_iter().filter(|(_, score)| *score >= min_similarity).collect())
    }

    /// `query(question, limit, min_relevance)` — semantic search attaching
    /// a `relevance` score.
    pub async fn query(
        &self,
        question: &str,
        limit: usize,
        min_relevance: f32,
    ) -> Result<Vec<(Memory, f32)>> {
        let opts = QueryOptions::default().with_filters(and(self.own_memory_clauses())).with_limit(limit);
        let objects = self.collection.near_text(question, opts).await?;
        objects
            .into_iter()
            .map(|obj| {
                let relevance = obj.score.or(obj.distance).unwrap_or(0.0);
                Ok((parse_memory(obj.properties)?, relevance))
            })
            .collect::<Result<Vec<_>>>()
            .map(|results| results.into_iter().filter(|(_, score)| *score >= min_relevance).collect())
    }

    /// `update({memory_id, ...fields})` — writes changed fields only,
    /// bumps `updated_at`/`version`, returns the changed field names.
    pub async fn update(&self, memory_id: &str, patch: MemoryPatch) -> Result<Vec<String>> {
        let mut memory = self.fetch_owned(memory_id).await?;
        let mut changed = Vec::new();

        if let Some(content) = patch.content {
            memory.content = content;
            changed.push("content");
        }
        if let Some(title) = patch.title {
            memory.title = Some(title);
            changed.push("title");
        }
        if let Some(summary) = patch.summary {
            memory.summary = Some(summary);
            changed.push("summary");
        }
        if let Some(tags) = patch.tags {
            memory.tags = tags;
            changed.push("tags");
        }
        if let Some(memory_type) = patch.memory_type {
            memory.memory_type = memory_type;
            changed.push("memory_type");
        }
        if let Some(weight) = patch.weight {
            memory.weight = weight;
            changed.push("weight");
        }
        if let Some(trust) = patch.trust {
            memory.trust = trust;
            changed.push("trust");
        }
        if let Some(context) = patch.context {
            memory.context = context;
            changed.push("context");
        }
        if let Some(location) = patch.location {
            memory.location = Some(location);
            changed.push("location");
        }
        if let Some(references) = patch.references {
            memory.references = Some(references);
            changed.push("references");
        }
        if let Some(space_ids) = patch.space_ids {
            memory.space_ids = space_ids;
            changed.push("space_ids");
        }
        if let Some(group_ids) = patch.group_ids {
            memory.group_ids = group_ids;
            changed.push("group_ids");
        }

        if changed.is_empty() {
            return Ok(changed.into_iter().map(str::to_string).collect());
        }

        memory.updated_at = Utc::now();
        memory.version += 1;
        self.collection.update(&memory.id, memory_to_properties(&memory)?).await?;
        Ok(changed.into_iter().map(str::to_string).collect())
    }

    /// `delete({memory_id, reason})` — soft delete; reports relationships
    /// that reference this memory as orphaned without removing them.
    pub async fn delete(&self, memory_id: &str, reason: Option<String>) -> Result<DeleteOutcome> {
        let mut memory = self.fetch_owned(memory_id).await?;
        memory.deleted_at = Some(Utc::now());
        memory.deleted_by = Some(self.user_id.clone());
        memory.deletion_reason = reason;
        self.collection.update(&memory.id, memory_to_properties(&memory)?).await?;

        let clauses = and(vec![
            by_property("doc_type").equal(serde_json::json!(DocType::Relationship)),
            by_property("owner_id").equal(serde_json::json!(self.user_id)),
        ]);
        let opts = QueryOptions::default().with_filters(clauses);
        let objects = self.collection.hybrid("", opts).await?;

        let mut orphaned = Vec::new();
        for obj in objects {
            let relationship = crate::model::parse_relationship(obj.properties)?;
            if relationship.related_memory_ids.iter().any(|id| id == memory_id) {
                orphaned.push(relationship.id);
            }
        }

        Ok(DeleteOutcome { memory_id: memory.id, orphaned_relationship_ids: orphaned })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use confidant_core::testing::InMemoryCollection;
    use confidant_core::MemoryContext;

    use super::*;
    use crate::relationship_service::RelationshipService;

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
    async fn create_assigns_defaults() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let service = MemoryService::new(collection, "u1");
        let memory = service.create(new_memory("hello")).await.unwrap();
        assert_eq!(memory.version, 1);
        assert_eq!(memory.weight, 0.5);
        assert_eq!(memory.trust, 0.5);
        assert_eq!(memory.owner_id, "u1");
    }

    #[tokio::test]
    async fn update_bumps_version_and_reports_changed_fields() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let service = MemoryService::new(collection, "u1");
        let memory = service.create(new_memory("hello")).await.unwrap();
        let changed = service
            .update(&memory.id, MemoryPatch { content: Some("updated".to_string()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(changed, vec!["content"]);
        let reloaded = service.fetch_owned(&memory.id).await.unwrap();
        assert_eq!(reloaded.version, 2);
        assert_eq!(reloaded.content, "updated");
    }

    #[tokio::test]
    async fn other_users_memory_is_not_accessible() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let owner = MemoryService::new(collection.clone(), "u1");
        let memory = owner.create(new_memory("secret")).await.unwrap();
        let intruder = MemoryService::new(collection, "u2");
        let result = intruder.fetch_owned(&memory.id).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn delete_reports_orphaned_relationships() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let memories = MemoryService::new(collection.clone(), "u1");
        let relationships = RelationshipService::new(collection, "u1");

        let m1 = memories.create(new_memory("a")).await.unwrap();
        let m2 = memories.create(new_memory("b")).await.unwrap();
        let r1 = relationships
            .create(crate::model::NewRelationship {
                related_memory_ids: vec![m1.id.clone(), m2.id.clone()],
                relationship_type: "related_to".to_string(),
                observation: None,
                strength: None,
                confidence: 0.5,
                tags: HashSet::new(),
            })
            .await
            .unwrap();

        let outcome = memories.delete(&m1.id, None).await.unwrap();
        assert!(outcome.orphaned_relationship_ids.contains(&r1.id));
    }
}
