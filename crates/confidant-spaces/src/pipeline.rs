//! `PublicationPipeline` — the two-phase publish/retract/revise flows plus
//! immediate moderation and cross-destination search/query (spec §4.6).

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::Utc;
use confidant_core::{AuthContext, Collection, DocType, FilterExpr, Memory, QueryOptions, and, by_property, or};
use confidant_memory::{MemoryPatch, MemoryService};
use confidant_tokens::TokenStore;
use tracing::info;

use crate::id::composite_id;
use crate::model::{
    Destination, DestinationOutcome, ModerationAction, ModerationStatus, OutcomeStatus,
    PublicationOutcome, PublishedMemory, WriteMode,
};
use crate::moderation_config::ModerationConfigProvider;
use crate::payload::{PublishPayload, RetractPayload, RevisePayload};
use crate::resolver::DestinationCollections;
use crate::validation::{validate_group_ids, validate_space_ids};

pub struct PublicationPipeline<D, M> {
    user_id: String,
    memories: MemoryService,
    destinations: Arc<D>,
    moderation: Arc<M>,
    tokens: TokenStore,
}

impl<D, M> PublicationPipeline<D, M>
where
    D: DestinationCollections,
    M: ModerationConfigProvider,
{
    pub fn new(
        user_id: impl Into<String>,
        memories: MemoryService,
        destinations: Arc<D>,
        moderation: Arc<M>,
        tokens: TokenStore,
    ) -> Self {
        Self { user_id: user_id.into(), memories, destinations, moderation, tokens }
    }

    async fn upsert(&self, collection: &Arc<dyn Collection>, id: &str, row: &PublishedMemory) -> Result<()> {
        let properties = serde_json::to_value(row)?;
        if collection.fetch_by_id(id).await?.is_some() {
            collection.update(id, properties).await
        } else {
            collection.insert(Some(id.to_string()), properties).await.map(|_| ())
        }
    }

    async fn load_row(&self, collection: &Arc<dyn Collection>, id: &str) -> Result<Option<PublishedMemory>> {
        match collection.fetch_by_id(id).await? {
            Some(object) => Ok(Some(serde_json::from_value(object.properties)?)),
            None => Ok(None),
        }
    }

    fn new_row(&self, id: &str, source: &Memory, group_id: Option<String>) -> PublishedMemory {
        let now = Utc::now();
        PublishedMemory {
            id: id.to_string(),
            doc_type: DocType::Memory,
            source_owner_id: self.user_id.clone(),
            author_id: self.user_id.clone(),
            source_memory_id: source.id.clone(),
            content: source.content.clone(),
            title: source.title.clone(),
            summary: source.summary.clone(),
            memory_type: source.memory_type.clone(),
            tags: HashSet::new(),
            content_type: None,
            weight: source.weight,
            space_ids: HashSet::new(),
            group_id,
            moderation_status: ModerationStatus::Approved,
            moderated_by: None,
            moderated_at: None,
            write_mode: WriteMode::default(),
            overwrite_allowed_ids: HashSet::new(),
            created_at: now,
            updated_at: now,
            retracted_at: None,
            revision_history: Vec::new(),
            revision_count: 0,
        }
    }

    // ---- publish --------------------------------------------------------

    /// `publish({memory_id, spaces, groups, additional_tags})` request
    /// phase — validates destinations and the source memory up front so the
    /// confirm phase only has to run the fan-out.
    pub async fn publish_request(
        &self,
        memory_id: &str,
        spaces: Vec<String>,
        groups: Vec<String>,
        additional_tags: Vec<String>,
    ) -> Result<String> {
        if spaces.is_empty() && groups.is_empty() {
            bail!("At least one space or group is required to publish");
        }
        validate_space_ids(&spaces)?;
        validate_group_ids(&groups)?;
        self.memories.get(memory_id).await?;

        let payload = PublishPayload { memory_id: memory_id.to_string(), spaces, groups, additional_tags };
        let (_, token) =
            self.tokens.create_request(&self.user_id, "publish_memory", serde_json::to_value(&payload)?).await?;
        Ok(token)
    }

    pub async fn publish_confirm(&self, token: &str) -> Result<PublicationOutcome> {
        let request = self
            .tokens
            .validate_token(&self.user_id, token)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Confirmation token is expired or already consumed"))?;
        let payload: PublishPayload = serde_json::from_value(request.payload)?;
        let source = self.memories.get(&payload.memory_id).await?;
        let row_id = composite_id(&self.user_id, &source.id).to_string();

        let mut outcomes = Vec::new();
        let mut published_spaces = HashSet::new();
        let mut published_groups = HashSet::new();

        if !payload.spaces.is_empty() {
            match self.publish_to_spaces(&row_id, &source, &payload).await {
                Ok(()) => {
                    for space in &payload.spaces {
                        published_spaces.insert(space.clone());
                        outcomes.push(DestinationOutcome {
                            destination: Destination::Space(space.clone()),
                            status: OutcomeStatus::Success,
                            error: None,
                        });
                    }
                }
                Err(err) => {
                    for space in &payload.spaces {
                        outcomes.push(DestinationOutcome {
                            destination: Destination::Space(space.clone()),
                            status: OutcomeStatus::Failed,
                            error: Some(err.to_string()),
                        });
                    }
                }
            }
        }

        for group in &payload.groups {
            match self.publish_to_group(&row_id, &source, group, &payload).await {
                Ok(()) => {
                    published_groups.insert(group.clone());
                    outcomes.push(DestinationOutcome {
                        destination: Destination::Group(group.clone()),
                        status: OutcomeStatus::Success,
                        error: None,
                    });
                }
                Err(err) => outcomes.push(DestinationOutcome {
                    destination: Destination::Group(group.clone()),
                    status: OutcomeStatus::Failed,
                    error: Some(err.to_string()),
                }),
            }
        }

        let outcome = PublicationOutcome { outcomes };
        if !outcome.any_succeeded() {
            bail!("Publication failed: no destination accepted the memory");
        }
        if !self.tokens.confirm_request(&self.user_id, token).await? {
            bail!("Confirmation token was already consumed by a concurrent request");
        }

        let mut space_ids = source.space_ids.clone();
        space_ids.extend(published_spaces);
        let mut group_ids = source.group_ids.clone();
        group_ids.extend(published_groups);
        self.memories
            .update(
                &source.id,
                MemoryPatch { space_ids: Some(space_ids), group_ids: Some(group_ids), ..Default::default() },
            )
            .await?;

        info!(user = %self.user_id, memory = %source.id, "memory published");
        Ok(outcome)
    }

    async fn publish_to_spaces(&self, row_id: &str, source: &Memory, payload: &PublishPayload) -> Result<()> {
        let collection = self.destinations.spaces_collection();

        let mut requires_moderation = false;
        for space in &payload.spaces {
            if self.moderation.space_requires_moderation(space).await? {
                requires_moderation = true;
            }
        }

        let mut row = match self.load_row(&collection, row_id).await? {
            Some(row) => row,
            None => self.new_row(row_id, source, None),
        };
        row.space_ids.extend(payload.spaces.iter().cloned());
        row.tags.extend(source.tags.iter().cloned());
        row.tags.extend(payload.additional_tags.iter().cloned());
        row.content = source.content.clone();
        row.title = source.title.clone();
        row.summary = source.summary.clone();
        row.moderation_status =
            if requires_moderation { ModerationStatus::Pending } else { ModerationStatus::Approved };
        row.retracted_at = None;
        row.updated_at = Utc::now();

        self.upsert(&collection, row_id, &row).await
    }

    async fn publish_to_group(
        &self,
        row_id: &str,
        source: &Memory,
        group_id: &str,
        payload: &PublishPayload,
    ) -> Result<()> {
        let collection = self.destinations.group_collection(group_id);
        let requires_moderation = self.moderation.group_requires_moderation(group_id).await?;

        let mut row = match self.load_row(&collection, row_id).await? {
            Some(row) => row,
            None => self.new_row(row_id, source, Some(group_id.to_string())),
        };
        row.tags.extend(source.tags.iter().cloned());
        row.tags.extend(payload.additional_tags.iter().cloned());
        row.content = source.content.clone();
        row.title = source.title.clone();
        row.summary = source.summary.clone();
        row.moderation_status =
            if requires_moderation { ModerationStatus::Pending } else { ModerationStatus::Approved };
        row.retracted_at = None;
        row.updated_at = Utc::now();

        self.upsert(&collection, row_id, &row).await
    }

    // ---- retract ----------------------------------------------------------

    /// `retract({memory_id, spaces, groups})` request phase — every named
    /// destination must be a destination the memory is currently published
    /// to.
    pub async fn retract_request(
        &self,
        memory_id: &str,
        spaces: Vec<String>,
        groups: Vec<String>,
    ) -> Result<String> {
        let source = self.memories.get(memory_id).await?;
        let unpublished_spaces: Vec<&String> =
            spaces.iter().filter(|s| !source.space_ids.contains(*s)).collect();
        let unpublished_groups: Vec<&String> =
            groups.iter().filter(|g| !source.group_ids.contains(*g)).collect();
        if !unpublished_spaces.is_empty() || !unpublished_groups.is_empty() {
            let mut names: Vec<String> = unpublished_spaces.into_iter().cloned().collect();
            names.extend(unpublished_groups.into_iter().cloned());
            bail!("Memory is not published to: {}", names.join(", "));
        }

        let payload = RetractPayload { memory_id: memory_id.to_string(), spaces, groups };
        let (_, token) =
            self.tokens.create_request(&self.user_id, "retract_memory", serde_json::to_value(&payload)?).await?;
        Ok(token)
    }

    pub async fn retract_confirm(&self, token: &str) -> Result<PublicationOutcome> {
        let request = self
            .tokens
            .validate_token(&self.user_id, token)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Confirmation token is expired or already consumed"))?;
        let payload: RetractPayload = serde_json::from_value(request.payload)?;
        let source = self.memories.get(&payload.memory_id).await?;
        let row_id = composite_id(&self.user_id, &source.id).to_string();

        let mut outcomes = Vec::new();
        let mut retracted_spaces = HashSet::new();
        let mut retracted_groups = HashSet::new();

        if !payload.spaces.is_empty() {
            let collection = self.destinations.spaces_collection();
            match self.retract_from_row(&collection, &row_id, |row| {
                for space in &payload.spaces {
                    row.space_ids.remove(space);
                }
            }).await {
                Ok(()) => {
                    for space in &payload.spaces {
                        retracted_spaces.insert(space.clone());
                        outcomes.push(DestinationOutcome {
                            destination: Destination::Space(space.clone()),
                            status: OutcomeStatus::Success,
                            error: None,
                        });
                    }
                }
                Err(err) => {
                    for space in &payload.spaces {
                        outcomes.push(DestinationOutcome {
                            destination: Destination::Space(space.clone()),
                            status: OutcomeStatus::Failed,
                            error: Some(err.to_string()),
                        });
                    }
                }
            }
        }

        for group in &payload.groups {
            let collection = self.destinations.group_collection(group);
            match self.retract_from_row(&collection, &row_id, |_row| {}).await {
                Ok(()) => {
                    retracted_groups.insert(group.clone());
                    outcomes.push(DestinationOutcome {
                        destination: Destination::Group(group.clone()),
                        status: OutcomeStatus::Success,
                        error: None,
                    });
                }
                Err(err) => outcomes.push(DestinationOutcome {
                    destination: Destination::Group(group.clone()),
                    status: OutcomeStatus::Failed,
                    error: Some(err.to_string()),
                }),
            }
        }

        let outcome = PublicationOutcome { outcomes };
        if !outcome.any_succeeded() {
            bail!("Retraction failed: no destination row could be updated");
        }
        if !self.tokens.confirm_request(&self.user_id, token).await? {
            bail!("Confirmation token was already consumed by a concurrent request");
        }

        let space_ids: HashSet<String> =
            source.space_ids.difference(&retracted_spaces).cloned().collect();
        let group_ids: HashSet<String> =
            source.group_ids.difference(&retracted_groups).cloned().collect();
        self.memories
            .update(
                &source.id,
                MemoryPatch { space_ids: Some(space_ids), group_ids: Some(group_ids), ..Default::default() },
            )
            .await?;

        info!(user = %self.user_id, memory = %source.id, "memory retracted");
        Ok(outcome)
    }

    /// Mutates the row in place (stripping space membership for
    /// space-collection retractions; a group row's retraction needs no
    /// field change beyond the timestamp) and always stamps
    /// `retracted_at`. The row is left in place afterward (spec §4.6
    /// "orphan model" — retraction never deletes the row).
    async fn retract_from_row(
        &self,
        collection: &Arc<dyn Collection>,
        row_id: &str,
        mutate: impl FnOnce(&mut PublishedMemory),
    ) -> Result<()> {
        let mut row = self
            .load_row(collection, row_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("No published row found for this destination"))?;
        mutate(&mut row);
        row.retracted_at = Some(Utc::now());
        row.updated_at = Utc::now();
        self.upsert(collection, row_id, &row).await
    }

    // ---- revise -------------------------------------------------------

    /// `revise(memory_id)` request phase — the revision content is whatever
    /// the source memory's current content is at confirm time, so the
    /// request only needs to snapshot which destinations get revised.
    pub async fn revise_request(&self, memory_id: &str) -> Result<String> {
        let source = self.memories.get(memory_id).await?;
        if source.space_ids.is_empty() && source.group_ids.is_empty() {
            bail!("Memory has no published copies to revise");
        }
        let payload = RevisePayload {
            memory_id: memory_id.to_string(),
            space_ids: source.space_ids.clone(),
            group_ids: source.group_ids.clone(),
        };
        let (_, token) =
            self.tokens.create_request(&self.user_id, "revise_memory", serde_json::to_value(&payload)?).await?;
        Ok(token)
    }

    pub async fn revise_confirm(&self, token: &str) -> Result<PublicationOutcome> {
        let request = self
            .tokens
            .validate_token(&self.user_id, token)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Confirmation token is expired or already consumed"))?;
        let payload: RevisePayload = serde_json::from_value(request.payload)?;
        let source = self.memories.get(&payload.memory_id).await?;
        let row_id = composite_id(&self.user_id, &source.id).to_string();

        let mut outcomes = Vec::new();

        if !payload.space_ids.is_empty() {
            let collection = self.destinations.spaces_collection();
            outcomes.push(self.revise_row(&collection, &row_id, &source, Destination::Space(String::new())).await);
        }
        for group in &payload.group_ids {
            let collection = self.destinations.group_collection(group);
            outcomes.push(self.revise_row(&collection, &row_id, &source, Destination::Group(group.clone())).await);
        }

        let outcome = PublicationOutcome { outcomes };
        if !outcome.any_succeeded() {
            bail!("Revision failed: no published copy could be updated");
        }
        if !self.tokens.confirm_request(&self.user_id, token).await? {
            bail!("Confirmation token was already consumed by a concurrent request");
        }

        info!(user = %self.user_id, memory = %source.id, "memory revised");
        Ok(outcome)
    }

    async fn revise_row(
        &self,
        collection: &Arc<dyn Collection>,
        row_id: &str,
        source: &Memory,
        destination: Destination,
    ) -> DestinationOutcome {
        let result: Result<OutcomeStatus> = async {
            let Some(mut row) = self.load_row(collection, row_id).await? else {
                return Ok(OutcomeStatus::Skipped);
            };
            if row.content == source.content {
                return Ok(OutcomeStatus::Skipped);
            }
            row.push_revision(row.content.clone(), Utc::now());
            row.content = source.content.clone();
            row.title = source.title.clone();
            row.summary = source.summary.clone();
            row.updated_at = Utc::now();
            self.upsert(collection, row_id, &row).await?;
            Ok(OutcomeStatus::Success)
        }
        .await;

        match result {
            Ok(status) => DestinationOutcome { destination, status, error: None },
            Err(err) => DestinationOutcome { destination, status: OutcomeStatus::Failed, error: Some(err.to_string()) },
        }
    }

    // ---- moderate -------------------------------------------------------

    /// `moderate(row_id, action, auth)` — immediate, not two-phase. `row_id`
    /// addresses an already-published row directly (the composite id), not
    /// the source memory: moderation acts on a destination's copy, which
    /// may outlive or diverge from the source after a revise.
    pub async fn moderate(
        &self,
        space_or_group: Destination,
        row_id: &str,
        action: ModerationAction,
        moderator: &AuthContext,
    ) -> Result<()> {
        let collection = match &space_or_group {
            Destination::Space(_) => self.destinations.spaces_collection(),
            Destination::Group(group_id) => self.destinations.group_collection(group_id),
        };
        let authorized = match &space_or_group {
            Destination::Space(_) => moderator.can_moderate_any(),
            Destination::Group(group_id) => moderator.can_moderate_in(group_id),
        };
        if !authorized {
            bail!("Permission denied: not authorized to moderate this destination");
        }

        let mut row = self
            .load_row(&collection, row_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Published memory not found: {row_id}"))?;
        row.moderation_status = action.resulting_status();
        row.moderated_by = Some(moderator.user_id.clone());
        row.moderated_at = Some(Utc::now());
        row.updated_at = Utc::now();
        self.upsert(&collection, row_id, &row).await?;
        info!(moderator = %moderator.user_id, row = row_id, ?action, "published memory moderated");
        Ok(())
    }

    // ---- search / query ---------------------------------------------------

    async fn collect(
        &self,
        collections: &[Arc<dyn Collection>],
        query: &str,
        filters: FilterExpr,
        moderator: Option<&AuthContext>,
        offset: usize,
        limit: usize,
        use_hybrid: bool,
    ) -> Result<Vec<PublishedMemory>> {
        let moderation_clause = match moderator {
            Some(_) => None,
            None => Some(or(vec![
                by_property("moderation_status").equal(serde_json::json!(ModerationStatus::Approved)),
                by_property("moderation_status").is_null(),
            ])),
        };
        let full_filter = match moderation_clause {
            Some(clause) => and(vec![
                by_property("doc_type").equal(serde_json::json!(DocType::Memory)),
                filters,
                clause,
            ]),
            None => and(vec![by_property("doc_type").equal(serde_json::json!(DocType::Memory)), filters]),
        };

        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for collection in collections {
            let opts = QueryOptions::default().with_filters(full_filter.clone());
            let objects = if use_hybrid { collection.hybrid(query, opts).await? } else { collection.near_text(query, opts).await? };
            for object in objects {
                if seen.insert(object.uuid.clone()) {
                    rows.push((object.score.or(object.distance).unwrap_or(0.0), serde_json::from_value::<PublishedMemory>(object.properties)?));
                }
            }
        }
        rows.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(rows.into_iter().skip(offset).take(limit).map(|(_, row)| row).collect())
    }

    /// `search(query, {spaces, groups, content_type, include_comments, tags,
    /// weight_min, weight_max, created_after, created_before, offset,
    /// limit}, moderator?)` — full-text across the unified spaces collection
    /// and the named group collections.
    #[allow(clippy::too_many_arguments)]
    pub async fn search(
        &self,
        query: &str,
        spaces: &[String],
        groups: &[String],
        content_type: Option<&str>,
        include_comments: bool,
        tags: &[String],
        weight_min: Option<f32>,
        weight_max: Option<f32>,
        created_after: Option<chrono::DateTime<Utc>>,
        created_before: Option<chrono::DateTime<Utc>>,
        moderator: Option<&AuthContext>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PublishedMemory>> {
        let filters = self.build_filters(
            spaces, content_type, include_comments, tags, weight_min, weight_max, created_after, created_before, false,
        );
        let collections = self.resolve_collections(spaces, groups);
        self.collect(&collections, query, filters, moderator, offset, limit, true).await
    }

    /// `query(question, {...same filters..., min_relevance})` — `nearText`
    /// against the unified public collection only, filtered by
    /// `spaces CONTAINS ANY …` (spec.md:193). Unlike `search`, group
    /// collections are never consulted here.
    #[allow(clippy::too_many_arguments)]
    pub async fn query(
        &self,
        question: &str,
        spaces: &[String],
        content_type: Option<&str>,
        include_comments: bool,
        tags: &[String],
        weight_min: Option<f32>,
        weight_max: Option<f32>,
        created_after: Option<chrono::DateTime<Utc>>,
        created_before: Option<chrono::DateTime<Utc>>,
        moderator: Option<&AuthContext>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PublishedMemory>> {
        let filters = self.build_filters(
            spaces, content_type, include_comments, tags, weight_min, weight_max, created_after, created_before, true,
        );
        let collections = vec![self.destinations.spaces_collection()];
        self.collect(&collections, question, filters, moderator, offset, limit, false).await
    }

    fn resolve_collections(&self, spaces: &[String], groups: &[String]) -> Vec<Arc<dyn Collection>> {
        let mut collections = Vec::new();
        if spaces.is_empty() && groups.is_empty() || !spaces.is_empty() {
            collections.push(self.destinations.spaces_collection());
        }
        for group in groups {
            collections.push(self.destinations.group_collection(group));
        }
        collections
    }

    #[allow(clippy::too_many_arguments)]
    fn build_filters(
        &self,
        spaces: &[String],
        content_type: Option<&str>,
        include_comments: bool,
        tags: &[String],
        weight_min: Option<f32>,
        weight_max: Option<f32>,
        created_after: Option<chrono::DateTime<Utc>>,
        created_before: Option<chrono::DateTime<Utc>>,
        require_spaces_filter: bool,
    ) -> FilterExpr {
        let mut clauses = Vec::new();
        if !spaces.is_empty() || require_spaces_filter {
            clauses.push(by_property("space_ids").contains_any(spaces.iter().map(|s| serde_json::json!(s)).collect()));
        }
        if let Some(content_type) = content_type {
            clauses.push(by_property("content_type").equal(serde_json::json!(content_type)));
        } else if !include_comments {
            clauses.push(by_property("content_type").not_equal(serde_json::json!("comment")));
        }
        for tag in tags {
            clauses.push(by_property("tags").contains_any(vec![serde_json::json!(tag)]));
        }
        if let Some(min) = weight_min {
            clauses.push(by_property("weight").greater_or_equal(serde_json::json!(min)));
        }
        if let Some(max) = weight_max {
            clauses.push(by_property("weight").less_or_equal(serde_json::json!(max)));
        }
        if let Some(after) = created_after {
            clauses.push(by_property("created_at").greater_or_equal(serde_json::json!(after)));
        }
        if let Some(before) = created_before {
            clauses.push(by_property("created_at").less_or_equal(serde_json::json!(before)));
        }
        if clauses.is_empty() { and(vec![]) } else { and(clauses) }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use confidant_core::testing::{InMemoryCollection, InMemoryKVStore};
    use confidant_core::{Collection, GroupMembership, MemoryContext, Permissions};
    use confidant_memory::{MemoryService, NewMemory};
    use confidant_tokens::TokenStore;

    use super::*;
    use crate::moderation_config::KvModerationConfig;
    use crate::resolver::testing::InMemoryDestinations;

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
    async fn publish_then_retract_round_trips_membership() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let memories = MemoryService::new(collection, "owner");
        let destinations = Arc::new(InMemoryDestinations::new());
        let kv: Arc<dyn confidant_core::KVDocStore> = Arc::new(InMemoryKVStore::new());
        let moderation = Arc::new(KvModerationConfig::new(kv.clone()));
        let tokens = TokenStore::new(kv);
        let memory = memories.create(new_memory("hello")).await.unwrap();

        let pipeline =
            PublicationPipeline::new("owner", memories, destinations, moderation, tokens);

        let token = pipeline
            .publish_request(&memory.id, vec!["the_void".to_string()], vec![], vec!["extra".to_string()])
            .await
            .unwrap();
        let outcome = pipeline.publish_confirm(&token).await.unwrap();
        assert!(outcome.any_succeeded());

        let row_id = composite_id("owner", &memory.id).to_string();
        let row = pipeline
            .load_row(&pipeline.destinations.spaces_collection(), &row_id)
            .await
            .unwrap()
            .unwrap();
        assert!(row.space_ids.contains("the_void"));
        assert!(row.tags.contains("extra"));
        assert_eq!(row.moderation_status, ModerationStatus::Approved);

        let retract_token =
            pipeline.retract_request(&memory.id, vec!["the_void".to_string()], vec![]).await.unwrap();
        let retract_outcome = pipeline.retract_confirm(&retract_token).await.unwrap();
        assert!(retract_outcome.any_succeeded());

        let row = pipeline
            .load_row(&pipeline.destinations.spaces_collection(), &row_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!row.space_ids.contains("the_void"));
        assert!(row.retracted_at.is_some());
    }

    #[tokio::test]
    async fn publish_requires_moderation_when_space_configured() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let memories = MemoryService::new(collection, "owner");
        let destinations = Arc::new(InMemoryDestinations::new());
        let kv: Arc<dyn confidant_core::KVDocStore> = Arc::new(InMemoryKVStore::new());
        let moderation = Arc::new(KvModerationConfig::new(kv.clone()));
        moderation.set_space_requires_moderation("mod_space", true).await.unwrap();
        let tokens = TokenStore::new(kv);
        let memory = memories.create(new_memory("hello")).await.unwrap();
        let pipeline = PublicationPipeline::new("owner", memories, destinations, moderation, tokens);

        let token =
            pipeline.publish_request(&memory.id, vec!["mod_space".to_string()], vec![], vec![]).await.unwrap();
        pipeline.publish_confirm(&token).await.unwrap();

        let row_id = composite_id("owner", &memory.id).to_string();
        let row =
            pipeline.load_row(&pipeline.destinations.spaces_collection(), &row_id).await.unwrap().unwrap();
        assert_eq!(row.moderation_status, ModerationStatus::Pending);
    }

    #[tokio::test]
    async fn revise_pushes_bounded_history_and_skips_stale_destination() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let memories = MemoryService::new(collection, "owner");
        let destinations = Arc::new(InMemoryDestinations::new());
        let kv: Arc<dyn confidant_core::KVDocStore> = Arc::new(InMemoryKVStore::new());
        let moderation = Arc::new(KvModerationConfig::new(kv.clone()));
        let tokens = TokenStore::new(kv);
        let memory = memories.create(new_memory("v1")).await.unwrap();
        let pipeline = PublicationPipeline::new("owner", memories, destinations, moderation, tokens);

        let token = pipeline.publish_request(&memory.id, vec!["the_void".to_string()], vec![], vec![]).await.unwrap();
        pipeline.publish_confirm(&token).await.unwrap();

        pipeline.memories.update(&memory.id, MemoryPatch { content: Some("v2".to_string()), ..Default::default() }).await.unwrap();

        let revise_token = pipeline.revise_request(&memory.id).await.unwrap();
        let outcome = pipeline.revise_confirm(&revise_token).await.unwrap();
        assert!(outcome.any_succeeded());

        let row_id = composite_id("owner", &memory.id).to_string();
        let row = pipeline.load_row(&pipeline.destinations.spaces_collection(), &row_id).await.unwrap().unwrap();
        assert_eq!(row.content, "v2");
        assert_eq!(row.revision_count, 1);
        assert_eq!(row.revision_history[0].content, "v1");
    }

    #[tokio::test]
    async fn moderate_requires_authorization() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let memories = MemoryService::new(collection, "owner");
        let destinations = Arc::new(InMemoryDestinations::new());
        let kv: Arc<dyn confidant_core::KVDocStore> = Arc::new(InMemoryKVStore::new());
        let moderation = Arc::new(KvModerationConfig::new(kv.clone()));
        let tokens = TokenStore::new(kv);
        let memory = memories.create(new_memory("hello")).await.unwrap();
        let pipeline = PublicationPipeline::new("owner", memories, destinations, moderation, tokens);
        let token = pipeline.publish_request(&memory.id, vec!["the_void".to_string()], vec![], vec![]).await.unwrap();
        pipeline.publish_confirm(&token).await.unwrap();
        let row_id = composite_id("owner", &memory.id).to_string();

        let non_moderator = AuthContext { user_id: "intruder".to_string(), group_memberships: vec![] };
        let result = pipeline
            .moderate(Destination::Space("the_void".to_string()), &row_id, ModerationAction::Remove, &non_moderator)
            .await;
        assert!(result.is_err());

        let moderator = AuthContext {
            user_id: "mod".to_string(),
            group_memberships: vec![GroupMembership {
                group_id: "eng".to_string(),
                permissions: Permissions { can_revise: false, can_overwrite: false, can_moderate: true },
            }],
        };
        // spaces moderation requires `can_moderate_any`, satisfied by any membership.
        pipeline
            .moderate(Destination::Space("the_void".to_string()), &row_id, ModerationAction::Remove, &moderator)
            .await
            .unwrap();
        let row = pipeline.load_row(&pipeline.destinations.spaces_collection(), &row_id).await.unwrap().unwrap();
        assert_eq!(row.moderation_status, ModerationStatus::Removed);
    }

    #[tokio::test]
    async fn search_with_no_scope_named_falls_back_to_the_unified_collection() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let memories = MemoryService::new(collection, "owner");
        let destinations = Arc::new(InMemoryDestinations::new());
        let kv: Arc<dyn confidant_core::KVDocStore> = Arc::new(InMemoryKVStore::new());
        let moderation = Arc::new(KvModerationConfig::new(kv.clone()));
        let tokens = TokenStore::new(kv);
        let memory = memories.create(new_memory("hello")).await.unwrap();
        let pipeline = PublicationPipeline::new("owner", memories, destinations, moderation, tokens);

        let token = pipeline.publish_request(&memory.id, vec!["the_void".to_string()], vec![], vec![]).await.unwrap();
        pipeline.publish_confirm(&token).await.unwrap();

        let results = pipeline
            .search("hello", &[], &[], None, false, &[], None, None, None, None, None, 0, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1, "an unscoped search must still consult the unified spaces collection");
    }

    #[tokio::test]
    async fn search_distinguishes_a_group_destination_from_a_space_destination() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let memories = MemoryService::new(collection, "owner");
        let destinations = Arc::new(InMemoryDestinations::new());
        let kv: Arc<dyn confidant_core::KVDocStore> = Arc::new(InMemoryKVStore::new());
        let moderation = Arc::new(KvModerationConfig::new(kv.clone()));
        let tokens = TokenStore::new(kv);
        let space_memory = memories.create(new_memory("hello from the void")).await.unwrap();
        let group_memory = memories.create(new_memory("hello from engineering")).await.unwrap();
        let pipeline = PublicationPipeline::new("owner", memories, destinations, moderation, tokens);

        let space_token =
            pipeline.publish_request(&space_memory.id, vec!["the_void".to_string()], vec![], vec![]).await.unwrap();
        pipeline.publish_confirm(&space_token).await.unwrap();
        let group_token =
            pipeline.publish_request(&group_memory.id, vec![], vec!["eng".to_string()], vec![]).await.unwrap();
        pipeline.publish_confirm(&group_token).await.unwrap();

        let space_only = pipeline
            .search("hello", &["the_void".to_string()], &[], None, false, &[], None, None, None, None, None, 0, 10)
            .await
            .unwrap();
        assert_eq!(space_only.len(), 1);
        assert_eq!(space_only[0].source_memory_id, space_memory.id);

        let group_only = pipeline
            .search("hello", &[], &["eng".to_string()], None, false, &[], None, None, None, None, None, 0, 10)
            .await
            .unwrap();
        assert_eq!(group_only.len(), 1);
        assert_eq!(group_only[0].source_memory_id, group_memory.id);
    }

    #[tokio::test]
    async fn query_only_ever_consults_the_unified_collection() {
        let collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let memories = MemoryService::new(collection, "owner");
        let destinations = Arc::new(InMemoryDestinations::new());
        let kv: Arc<dyn confidant_core::KVDocStore> = Arc::new(InMemoryKVStore::new());
        let moderation = Arc::new(KvModerationConfig::new(kv.clone()));
        let tokens = TokenStore::new(kv);
        let space_memory = memories.create(new_memory("hello from the void")).await.unwrap();
        let group_memory = memories.create(new_memory("hello from engineering")).await.unwrap();
        let pipeline = PublicationPipeline::new("owner", memories, destinations, moderation, tokens);

        let space_token =
            pipeline.publish_request(&space_memory.id, vec!["the_void".to_string()], vec![], vec![]).await.unwrap();
        pipeline.publish_confirm(&space_token).await.unwrap();
        let group_token =
            pipeline.publish_request(&group_memory.id, vec![], vec!["eng".to_string()], vec![]).await.unwrap();
        pipeline.publish_confirm(&group_token).await.unwrap();

        // the memory published only into the group collection must never
        // surface, while the one published into the named space does.
        let results = pipeline
            .query("hello", &["the_void".to_string()], None, false, &[], None, None, None, None, None, 0, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_memory_id, space_memory.id);
    }
}
