//! In-memory stubs of [`Collection`] and [`KVDocStore`], shared by every
//! downstream crate's test suite.
//!
//! Grounded on the teacher's approach of pairing each provider interface
//! with an in-memory stub behind the same trait surface (see
//! `crates/memory/src/event_log.rs`'s crash-safe single-writer discipline,
//! adapted here to an in-process guarded map rather than a file). Not
//! `cfg(test)`-gated so every `confidant-*` crate's own test module can
//! depend on `confidant-core/testing` without duplicating a fixture.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::collection::{Collection, QueryOptions, StoredObject};
use crate::kvstore::{KVDocStore, WhereClause, WhereOp};

#[derive(Default)]
pub struct InMemoryCollection {
    rows: Mutex<HashMap<String, Value>>,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Vec<StoredObject> {
        self.rows
            .lock()
            .expect("in-memory collection lock poisoned")
            .iter()
            .map(|(uuid, properties)| StoredObject {
                uuid: uuid.clone(),
                properties: properties.clone(),
                score: None,
                distance: None,
            })
            .collect()
    }

    fn search(&self, query: &str, opts: QueryOptions) -> Vec<StoredObject> {
        let mut matches: Vec<StoredObject> = self
            .snapshot()
            .into_iter()
            .filter(|obj| opts.filters.as_ref().map(|f| f.matches(&obj.properties)).unwrap_or(true))
            .filter(|obj| query_matches(&obj.properties, query))
            .collect();

        matches.sort_by(|a, b| a.uuid.cmp(&b.uuid));

        let offset = opts.offset.unwrap_or(0);
        let matches = matches.into_iter().skip(offset);
        match opts.limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        }
    }
}

/// Lightweight stand-in for the backend's text relevance search: when `query`
/// is non-empty, require a case-insensitive substring hit against any string
/// property; embedding-backed relevance is out of scope (spec §1).
fn query_matches(properties: &Value, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    let Value::Object(map) = properties else { return false };
    map.values().any(|v| match v {
        Value::String(s) => s.to_lowercase().contains(&needle),
        _ => false,
    })
}

#[async_trait]
impl Collection for InMemoryCollection {
    async fn insert(&self, id: Option<String>, properties: Value) -> anyhow::Result<String> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.rows.lock().expect("lock poisoned").insert(id.clone(), properties);
        Ok(id)
    }

    async fn update(&self, id: &str, properties: Value) -> anyhow::Result<()> {
        let mut rows = self.rows.lock().expect("lock poisoned");
        let existing = rows.entry(id.to_string()).or_insert_with(|| Value::Object(Default::default()));
        merge_object(existing, properties);
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> anyhow::Result<()> {
        self.rows.lock().expect("lock poisoned").remove(id);
        Ok(())
    }

    async fn fetch_by_id(&self, id: &str) -> anyhow::Result<Option<StoredObject>> {
        Ok(self.rows.lock().expect("lock poisoned").get(id).map(|properties| StoredObject {
            uuid: id.to_string(),
            properties: properties.clone(),
            score: None,
            distance: None,
        }))
    }

    async fn hybrid(&self, query: &str, opts: QueryOptions) -> anyhow::Result<Vec<StoredObject>> {
        Ok(self.search(query, opts))
    }

    async fn bm25(&self, query: &str, opts: QueryOptions) -> anyhow::Result<Vec<StoredObject>> {
        Ok(self.search(query, opts))
    }

    async fn near_text(&self, query: &str, opts: QueryOptions) -> anyhow::Result<Vec<StoredObject>> {
        Ok(self.search(query, opts))
    }

    async fn near_vector(&self, _vector: &[f32], opts: QueryOptions) -> anyhow::Result<Vec<StoredObject>> {
        Ok(self.search("", opts))
    }
}

fn merge_object(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                target_map.insert(key, value);
            }
        }
        (target, patch) => *target = patch,
    }
}

#[derive(Default)]
pub struct InMemoryKVStore {
    docs: Mutex<HashMap<(String, String), Value>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn where_matches(doc: &Value, clause: &WhereClause) -> bool {
    let Some(actual) = doc.get(&clause.field) else { return false };
    match clause.op {
        WhereOp::Eq => actual == &clause.value,
        WhereOp::Ne => actual != &clause.value,
        WhereOp::Gt => actual.as_f64().zip(clause.value.as_f64()).map(|(a, b)| a > b).unwrap_or(false),
        WhereOp::Gte => actual.as_f64().zip(clause.value.as_f64()).map(|(a, b)| a >= b).unwrap_or(false),
        WhereOp::Lt => actual.as_f64().zip(clause.value.as_f64()).map(|(a, b)| a < b).unwrap_or(false),
        WhereOp::Lte => actual.as_f64().zip(clause.value.as_f64()).map(|(a, b)| a <= b).unwrap_or(false),
    }
}

#[async_trait]
impl KVDocStore for InMemoryKVStore {
    async fn get(&self, path: &str, id: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.docs.lock().expect("lock poisoned").get(&(path.to_string(), id.to_string())).cloned())
    }

    async fn set(&self, path: &str, id: &str, data: Value, merge: bool) -> anyhow::Result<()> {
        let mut docs = self.docs.lock().expect("lock poisoned");
        let key = (path.to_string(), id.to_string());
        if merge {
            let existing = docs.entry(key).or_insert_with(|| Value::Object(Default::default()));
            merge_object(existing, data);
        } else {
            docs.insert(key, data);
        }
        Ok(())
    }

    async fn add(&self, path: &str, data: Value) -> anyhow::Result<String> {
        let id = Uuid::new_v4().to_string();
        self.docs.lock().expect("lock poisoned").insert((path.to_string(), id.clone()), data);
        Ok(id)
    }

    async fn delete(&self, path: &str, id: &str) -> anyhow::Result<()> {
        self.docs.lock().expect("lock poisoned").remove(&(path.to_string(), id.to_string()));
        Ok(())
    }

    async fn query(
        &self,
        path: &str,
        where_clauses: &[WhereClause],
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<(String, Value)>> {
        let docs = self.docs.lock().expect("lock poisoned");
        let mut matches: Vec<(String, Value)> = docs
            .iter()
            .filter(|((doc_path, _), _)| doc_path == path)
            .filter(|(_, doc)| where_clauses.iter().all(|clause| where_matches(doc, clause)))
            .map(|((_, id), doc)| (id.clone(), doc.clone()))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }

    /// Single critical section covering read-check-write — the guard against
    /// the lost-update race spec §5 calls out for the token state machine.
    async fn compare_and_set(
        &self,
        path: &str,
        id: &str,
        field: &str,
        expected: Value,
        patch: Value,
    ) -> anyhow::Result<bool> {
        let mut docs = self.docs.lock().expect("lock poisoned");
        let key = (path.to_string(), id.to_string());
        let Some(existing) = docs.get_mut(&key) else { return Ok(false) };
        if existing.get(field) != Some(&expected) {
            return Ok(false);
        }
        merge_object(existing, patch);
        Ok(true)
    }
}
