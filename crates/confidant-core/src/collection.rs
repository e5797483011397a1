//! `Collection` — the vector-store boundary the core consumes (spec §6).
//!
//! Concrete backends (Weaviate, Qdrant, …) implement this trait; the core
//! never speaks their wire protocol directly.

use async_trait::async_trait;
use serde_json::Value;

use crate::filter::FilterExpr;

/// A row returned from a `Collection` query: the store's id plus its
/// properties, and (for similarity/relevance queries) a score or distance.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub uuid: String,
    pub properties: Value,
    pub score: Option<f32>,
    pub distance: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub filters: Option<FilterExpr>,
    pub alpha: Option<f32>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl QueryOptions {
    pub fn with_filters(mut self, filters: FilterExpr) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[async_trait]
pub trait Collection: Send + Sync {
    /// `data.insert({id?, properties})`. When `id` is `None` the backend
    /// assigns one (typically a UUID) and returns it.
    async fn insert(&self, id: Option<String>, properties: Value) -> anyhow::Result<String>;

    /// `data.update({id, properties})` — merges `properties` into the
    /// existing row.
    async fn update(&self, id: &str, properties: Value) -> anyhow::Result<()>;

    /// `data.deleteById(id)`.
    async fn delete_by_id(&self, id: &str) -> anyhow::Result<()>;

    /// `query.fetchObjectById(id)`.
    async fn fetch_by_id(&self, id: &str) -> anyhow::Result<Option<StoredObject>>;

    /// `query.hybrid(query, opts)` — combined BM25 + vector search.
    async fn hybrid(&self, query: &str, opts: QueryOptions) -> anyhow::Result<Vec<StoredObject>>;

    /// `query.bm25(query, opts)`.
    async fn bm25(&self, query: &str, opts: QueryOptions) -> anyhow::Result<Vec<StoredObject>>;

    /// `query.nearText(query, opts)`.
    async fn near_text(&self, query: &str, opts: QueryOptions) -> anyhow::Result<Vec<StoredObject>>;

    /// `query.nearVector(vector, opts)`.
    async fn near_vector(&self, vector: &[f32], opts: QueryOptions) -> anyhow::Result<Vec<StoredObject>>;
}
