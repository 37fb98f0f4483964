//! In-memory `DocumentStore` used for local runs and tests.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::{Cursor, Direction, Document, DocumentStore, Filter, FilterOp, Query};
use crate::error::StoreError;

// == In-Memory Store ==
/// Collections of JSON documents kept in ordered maps.
///
/// Counts reads so callers can assert that a cache absorbed them, and can
/// be told to fail or slow down upcoming calls.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    reads: AtomicUsize,
    injected_failures: Mutex<VecDeque<StoreError>>,
    latency: Mutex<Option<Duration>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a collection without counting as traffic.
    pub fn insert(&self, collection: &str, id: &str, data: Value) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
    }

    /// Number of `get` and `query` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Makes the next call fail with `error`. Queued failures are used in order.
    pub fn fail_next(&self, error: StoreError) {
        self.injected_failures.lock().push_back(error);
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    async fn begin_call(&self) -> Result<(), StoreError> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.injected_failures.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.begin_call().await?;

        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.begin_call().await?;

        let mut docs: Vec<Document> = {
            let collections = self.collections.read();
            collections
                .get(&query.collection)
                .map(|docs| {
                    docs.iter()
                        .map(|(id, data)| Document::new(id.clone(), data.clone()))
                        .filter(|doc| query.filters.iter().all(|f| matches_filter(doc, f)))
                        .collect()
                })
                .unwrap_or_default()
        };

        docs.sort_by(|a, b| compare_documents(a, b, query));
        apply_cursor_and_limit(docs, query)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        self.begin_call().await?;
        self.insert(collection, id, data);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        self.begin_call().await?;

        let mut collections = self.collections.write();
        let existing = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;

        match (existing, patch) {
            (Value::Object(target), Value::Object(fields)) => {
                target.extend(fields);
                Ok(())
            }
            (_, _) => Err(StoreError::InvalidQuery(
                "update requires object document and patch".to_string(),
            )),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.begin_call().await?;
        if let Some(docs) = self.collections.write().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

fn matches_filter(doc: &Document, filter: &Filter) -> bool {
    let field = doc.field(&filter.field);
    match filter.op {
        FilterOp::Eq => field.as_ref() == Some(&filter.value),
        FilterOp::Ne => field.is_some() && field.as_ref() != Some(&filter.value),
        FilterOp::Lt => ordered(&field, &filter.value, |o| o == CmpOrdering::Less),
        FilterOp::Lte => ordered(&field, &filter.value, |o| o != CmpOrdering::Greater),
        FilterOp::Gt => ordered(&field, &filter.value, |o| o == CmpOrdering::Greater),
        FilterOp::Gte => ordered(&field, &filter.value, |o| o != CmpOrdering::Less),
        FilterOp::In => match (&field, &filter.value) {
            (Some(value), Value::Array(options)) => options.contains(value),
            _ => false,
        },
        FilterOp::ArrayContains => match &field {
            Some(Value::Array(items)) => items.contains(&filter.value),
            _ => false,
        },
    }
}

/// Range comparisons only apply between values of the same JSON type.
fn ordered(field: &Option<Value>, bound: &Value, accept: impl Fn(CmpOrdering) -> bool) -> bool {
    match field {
        Some(value) if type_rank(value) == type_rank(bound) => accept(compare_values(value, bound)),
        _ => false,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> CmpOrdering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(CmpOrdering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_documents(a: &Document, b: &Document, query: &Query) -> CmpOrdering {
    for order in &query.order_by {
        let left = a.field(&order.field).unwrap_or(Value::Null);
        let right = b.field(&order.field).unwrap_or(Value::Null);
        let ord = compare_values(&left, &right);
        let ord = match order.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != CmpOrdering::Equal {
            return ord;
        }
    }
    a.id.cmp(&b.id)
}

fn apply_cursor_and_limit(docs: Vec<Document>, query: &Query) -> Result<Vec<Document>, StoreError> {
    let position = |marker: &str| {
        docs.iter()
            .position(|doc| doc.id == marker)
            .ok_or_else(|| StoreError::InvalidQuery(format!("unknown cursor document {}", marker)))
    };

    let window: Vec<Document> = match &query.cursor {
        None => docs.iter().take(query.limit.unwrap_or(usize::MAX)).cloned().collect(),
        Some(Cursor::StartAfter(marker)) => {
            let start = position(&marker.0)? + 1;
            docs[start..]
                .iter()
                .take(query.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect()
        }
        Some(Cursor::EndBefore(marker)) => {
            let end = position(&marker.0)?;
            let start = query.limit.map_or(0, |limit| end.saturating_sub(limit));
            docs[start..end].to_vec()
        }
    };
    Ok(window)
}
