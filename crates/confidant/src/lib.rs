//! `Confidant` — the composition root binding one caller's `user_id` to
//! every component (C1–C6), the way `aigent_runtime::AgentRuntime` owns a
//! `MemoryManager` plus an `LlmRouter` and dispatches high-level operations
//! across both.

use std::sync::Arc;

use anyhow::Result;
use confidant_access::{AccessChecker, EscalationStore};
pub use confidant_access::AccessResult;
use confidant_config::GhostConfigProvider;
use confidant_core::{Collection, KVDocStore, Memory, Relationship};
use confidant_memory::{DeleteOutcome, MemoryService, NewMemory, NewRelationship, RelationshipService};
pub use confidant_memory::{MemoryPatch, RelationshipPatch};
use confidant_spaces::{DestinationCollections, ModerationConfigProvider, PublicationPipeline};
pub use confidant_spaces::{Destination, ModerationAction, PublicationOutcome, PublishedMemory};
use confidant_tokens::TokenStore;
pub use confidant_trust::{PromptView, format_memory_for_prompt, tier_for_access};

/// Owns one user's view over their own memories plus the shared components
/// (ghost-config-backed access control, confirmation tokens, space/group
/// publication) needed to act on the owner's behalf.
pub struct Confidant<C: GhostConfigProvider, D, M> {
    user_id: String,
    memories: MemoryService,
    relationships: RelationshipService,
    access: AccessChecker<C>,
    publication: PublicationPipeline<D, M>,
}

impl<C, D, M> Confidant<C, D, M>
where
    C: GhostConfigProvider,
    D: DestinationCollections,
    M: ModerationConfigProvider,
{
    pub fn new(
        user_id: impl Into<String>,
        memory_collection: Arc<dyn Collection>,
        kv: Arc<dyn KVDocStore>,
        config: C,
        destinations: Arc<D>,
        moderation: Arc<M>,
    ) -> Self {
        let user_id = user_id.into();
        let memories = MemoryService::new(memory_collection.clone(), user_id.clone());
        let relationships = RelationshipService::new(memory_collection.clone(), user_id.clone());
        let access = AccessChecker::new(config, EscalationStore::new(kv.clone()));
        let publication_memories = MemoryService::new(memory_collection, user_id.clone());
        let publication =
            PublicationPipeline::new(user_id.clone(), publication_memories, destinations, moderation, TokenStore::new(kv));
        Self { user_id, memories, relationships, access, publication }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    // ---- memories (C5) ----------------------------------------------------

    pub async fn create_memory(&self, input: NewMemory) -> Result<Memory> {
        self.memories.create(input).await
    }

    pub async fn get_memory(&self, memory_id: &str) -> Result<Memory> {
        self.memories.get(memory_id).await
    }

    pub async fn update_memory(&self, memory_id: &str, patch: MemoryPatch) -> Result<Vec<String>> {
        self.memories.update(memory_id, patch).await
    }

    pub async fn delete_memory(&self, memory_id: &str, reason: Option<String>) -> Result<DeleteOutcome> {
        self.memories.delete(memory_id, reason).await
    }

    pub async fn find_similar_memories(
        &self,
        memory_id: &str,
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<(Memory, f32)>> {
        self.memories.find_similar(memory_id, limit, min_similarity).await
    }

    pub async fn query_memories(
        &self,
        question: &str,
        limit: usize,
        min_relevance: f32,
    ) -> Result<Vec<(Memory, f32)>> {
        self.memories.query(question, limit, min_relevance).await
    }

    // ---- relationships (C5) ------------------------------------------------

    pub async fn create_relationship(&self, input: NewRelationship) -> Result<Relationship> {
        self.relationships.create(input).await
    }

    pub async fn update_relationship(
        &self,
        relationship_id: &str,
        patch: RelationshipPatch,
    ) -> Result<Vec<String>> {
        self.relationships.update(relationship_id, patch).await
    }

    pub async fn delete_relationship(&self, relationship_id: &str) -> Result<()> {
        self.relationships.delete(relationship_id).await
    }

    // ---- access control (C1/C2) --------------------------------------------

    /// Evaluate whether `accessor_id` may see `memory` at all, and resolve
    /// the trust tier the accessor is entitled to for the prompt view.
    pub async fn check_access(&self, accessor_id: &str, memory: &Memory) -> Result<AccessResult> {
        self.access.check_access(accessor_id, memory).await
    }

    pub async fn reset_access_block(&self, accessor_id: &str, memory_id: &str) -> Result<()> {
        self.access.reset_block(&self.user_id, accessor_id, memory_id).await
    }

    /// Pure redaction: no I/O, callers combine this with [`Self::check_access`]
    /// to get both the permission decision and the tier-appropriate view.
    pub fn format_for_prompt(&self, memory: &Memory, accessor_trust: f32, is_self: bool) -> PromptView {
        format_memory_for_prompt(memory, accessor_trust, is_self)
    }

    // ---- publication pipeline (C6) -----------------------------------------

    pub async fn publish_request(
        &self,
        memory_id: &str,
        spaces: Vec<String>,
        groups: Vec<String>,
        additional_tags: Vec<String>,
    ) -> Result<String> {
        self.publication.publish_request(memory_id, spaces, groups, additional_tags).await
    }

    pub async fn publish_confirm(&self, token: &str) -> Result<PublicationOutcome> {
        self.publication.publish_confirm(token).await
    }

    pub async fn retract_request(
        &self,
        memory_id: &str,
        spaces: Vec<String>,
        groups: Vec<String>,
    ) -> Result<String> {
        self.publication.retract_request(memory_id, spaces, groups).await
    }

    pub async fn retract_confirm(&self, token: &str) -> Result<PublicationOutcome> {
        self.publication.retract_confirm(token).await
    }

    pub async fn revise_request(&self, memory_id: &str) -> Result<String> {
        self.publication.revise_request(memory_id).await
    }

    pub async fn revise_confirm(&self, token: &str) -> Result<PublicationOutcome> {
        self.publication.revise_confirm(token).await
    }

    pub async fn moderate(
        &self,
        destination: Destination,
        row_id: &str,
        action: ModerationAction,
        moderator: &confidant_core::AuthContext,
    ) -> Result<()> {
        self.publication.moderate(destination, row_id, action, moderator).await
    }

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
        created_after: Option<chrono::DateTime<chrono::Utc>>,
        created_before: Option<chrono::DateTime<chrono::Utc>>,
        moderator: Option<&confidant_core::AuthContext>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PublishedMemory>> {
        self.publication
            .search(
                query, spaces, groups, content_type, include_comments, tags, weight_min, weight_max,
                created_after, created_before, moderator, offset, limit,
            )
            .await
    }

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
        created_after: Option<chrono::DateTime<chrono::Utc>>,
        created_before: Option<chrono::DateTime<chrono::Utc>>,
        moderator: Option<&confidant_core::AuthContext>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PublishedMemory>> {
        self.publication
            .query(
                question, spaces, content_type, include_comments, tags, weight_min, weight_max,
                created_after, created_before, moderator, offset, limit,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use confidant_config::{GhostConfig, GhostConfigStore};
    use confidant_core::testing::{InMemoryCollection, InMemoryKVStore};
    use confidant_core::MemoryContext;
    use confidant_spaces::KvModerationConfig;
    use confidant_spaces::resolver::testing::InMemoryDestinations;

    use super::*;

    fn confidant(user_id: &str) -> Confidant<GhostConfigStore, InMemoryDestinations, KvModerationConfig> {
        let memory_collection: Arc<dyn Collection> = Arc::new(InMemoryCollection::new());
        let kv: Arc<dyn KVDocStore> = Arc::new(InMemoryKVStore::new());
        let config = GhostConfigStore::new(kv.clone());
        let destinations = Arc::new(InMemoryDestinations::new());
        let moderation = Arc::new(KvModerationConfig::new(kv.clone()));
        Confidant::new(user_id, memory_collection, kv, config, destinations, moderation)
    }

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
    async fn owner_can_create_and_fetch_their_own_memory() {
        let confidant = confidant("owner");
        let memory = confidant.create_memory(new_memory("hello")).await.unwrap();
        let reloaded = confidant.get_memory(&memory.id).await.unwrap();
        assert_eq!(reloaded.content, "hello");
    }

    #[tokio::test]
    async fn non_owner_without_ghost_config_has_no_permission() {
        let confidant = confidant("owner");
        let memory = confidant.create_memory(new_memory("secret")).await.unwrap();
        let result = confidant.check_access("intruder", &memory).await.unwrap();
        assert!(matches!(result, AccessResult::NoPermission));
    }

    #[tokio::test]
    async fn publish_then_retract_round_trips_through_the_facade() {
        let confidant = confidant("owner");
        let memory = confidant.create_memory(new_memory("hello")).await.unwrap();

        let token = confidant
            .publish_request(&memory.id, vec!["the_void".to_string()], vec![], vec![])
            .await
            .unwrap();
        let outcome = confidant.publish_confirm(&token).await.unwrap();
        assert!(outcome.any_succeeded());

        let published = confidant.get_memory(&memory.id).await.unwrap();
        assert!(published.space_ids.contains("the_void"));

        let retract_token =
            confidant.retract_request(&memory.id, vec!["the_void".to_string()], vec![]).await.unwrap();
        let retract_outcome = confidant.retract_confirm(&retract_token).await.unwrap();
        assert!(retract_outcome.any_succeeded());

        let retracted = confidant.get_memory(&memory.id).await.unwrap();
        assert!(!retracted.space_ids.contains("the_void"));
    }

    #[tokio::test]
    async fn ghost_config_raises_a_non_owner_to_the_granted_trust_tier() {
        let kv: Arc<dyn KVDocStore> = Arc::new(InMemoryKVStore::new());
        let config_store = GhostConfigStore::new(kv.clone());
        config_store
            .set_ghost_config("owner", GhostConfig { enabled: true, default_public_trust: 0.75, ..Default::default() })
            .await
            .unwrap();

        let confidant = Confidant::new(
            "owner",
            Arc::new(InMemoryCollection::new()),
            kv.clone(),
            GhostConfigStore::new(kv.clone()),
            Arc::new(InMemoryDestinations::new()),
            Arc::new(KvModerationConfig::new(kv)),
        );
        let memory = confidant.create_memory(new_memory("hello")).await.unwrap();
        confidant.update_memory(&memory.id, MemoryPatch { trust: Some(0.5), ..Default::default() }).await.unwrap();
        let memory = confidant.get_memory(&memory.id).await.unwrap();

        let result = confidant.check_access("guest", &memory).await.unwrap();
        assert!(matches!(result, AccessResult::Granted { .. }));
    }

    #[tokio::test]
    async fn unscoped_search_still_finds_published_memories() {
        let confidant = confidant("owner");
        let memory = confidant.create_memory(new_memory("hello")).await.unwrap();
        let token = confidant
            .publish_request(&memory.id, vec!["the_void".to_string()], vec![], vec![])
            .await
            .unwrap();
        confidant.publish_confirm(&token).await.unwrap();

        let results = confidant
            .search("hello", &[], &[], None, false, &[], None, None, None, None, None, 0, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1, "search with no spaces/groups named must still hit the unified collection");
    }

    #[tokio::test]
    async fn search_and_query_distinguish_groups_from_spaces() {
        let confidant = confidant("owner");
        let space_memory = confidant.create_memory(new_memory("hello from the void")).await.unwrap();
        let group_memory = confidant.create_memory(new_memory("hello from engineering")).await.unwrap();

        let space_token = confidant
            .publish_request(&space_memory.id, vec!["the_void".to_string()], vec![], vec![])
            .await
            .unwrap();
        confidant.publish_confirm(&space_token).await.unwrap();
        let group_token = confidant
            .publish_request(&group_memory.id, vec![], vec!["eng".to_string()], vec![])
            .await
            .unwrap();
        confidant.publish_confirm(&group_token).await.unwrap();

        let group_only = confidant
            .search("hello", &[], &["eng".to_string()], None, false, &[], None, None, None, None, None, 0, 10)
            .await
            .unwrap();
        assert_eq!(group_only.len(), 1);
        assert_eq!(group_only[0].source_memory_id, group_memory.id);

        // `query` only ever looks at the unified collection, so only the
        // space-published memory is reachable through it.
        let queried = confidant
            .query("hello", &["the_void".to_string()], None, false, &[], None, None, None, None, None, 0, 10)
            .await
            .unwrap();
        assert_eq!(queried.len(), 1);
        assert_eq!(queried[0].source_memory_id, space_memory.id);
    }
}
