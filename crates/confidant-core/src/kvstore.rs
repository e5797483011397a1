//! `KVDocStore` — the metadata-store boundary for config, escalation state,
//! and confirmation tokens (spec §6).

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone)]
pub struct WhereClause {
    pub field: String,
    pub op: WhereOp,
    pub value: Value,
}

impl WhereClause {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { field: field.into(), op: WhereOp::Eq, value: value.into() }
    }
}

#[async_trait]
pub trait KVDocStore: Send + Sync {
    /// `getDocument(path, id)`.
    async fn get(&self, path: &str, id: &str) -> anyhow::Result<Option<Value>>;

    /// `setDocument(path, id, data, {merge?})`.
    async fn set(&self, path: &str, id: &str, data: Value, merge: bool) -> anyhow::Result<()>;

    /// `addDocument(path, data) -> {id}`.
    async fn add(&self, path: &str, data: Value) -> anyhow::Result<String>;

    /// `deleteDocument(path, id)`.
    async fn delete(&self, path: &str, id: &str) -> anyhow::Result<()>;

    /// `queryDocuments(path, {where, limit?})`.
    async fn query(
        &self,
        path: &str,
        where_clauses: &[WhereClause],
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<(String, Value)>>;

    /// Conditional update keyed on `field`'s current value — not part of the
    /// spec's listed KV surface verbatim, but required by spec §5/§9 to
    /// implement the confirmation token `pending -> terminal` transition as
    /// a guarded compare-and-set rather than a racy read-then-write.
    /// Returns `true` if the document existed, `field` held `expected`, and
    /// `patch` was applied; `false` otherwise (including: not found, or the
    /// field held a different value).
    async fn compare_and_set(
        &self,
        path: &str,
        id: &str,
        field: &str,
        expected: Value,
        patch: Value,
    ) -> anyhow::Result<bool>;
}
