//! Cached Repository Module
//!
//! CRUD access to one collection with read-through caching. Writes go to the
//! store first, then the affected cache keys are refreshed or invalidated.

mod retry;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::cache::SharedCache;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result, StoreError};
use crate::store::{Document, DocumentStore, Filter, OrderBy, Query};

pub use retry::{Backoff, RetryPolicy};

/// Filters, ordering and limit for a list read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListOptions {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl ListOptions {
    fn to_query(&self, collection: &str) -> Query {
        Query {
            collection: collection.to_string(),
            filters: self.filters.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            cursor: None,
        }
    }
}

/// One page of a list read plus totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult {
    pub items: Vec<Document>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

// == Cached Repository ==
pub struct CachedRepository {
    collection: String,
    store: Arc<dyn DocumentStore>,
    cache: SharedCache<Value>,
    ttl: Duration,
    retry: RetryPolicy,
}

impl CachedRepository {
    pub fn new(
        collection: impl Into<String>,
        store: Arc<dyn DocumentStore>,
        cache: SharedCache<Value>,
        ttl: Duration,
    ) -> Self {
        Self {
            collection: collection.into(),
            store,
            cache,
            ttl,
            retry: RetryPolicy::default(),
        }
    }

    /// Repository using the configured repository TTL.
    pub fn from_config(
        collection: impl Into<String>,
        store: Arc<dyn DocumentStore>,
        cache: SharedCache<Value>,
        config: &CacheConfig,
    ) -> Self {
        Self::new(collection, store, cache, config.repository_ttl)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    // == Keys ==
    pub fn document_key(&self, id: &str) -> String {
        format!("{}:{}", self.collection, id)
    }

    fn list_key(&self, query: &Query) -> String {
        format!("{}:list:{}", self.collection, query.fingerprint())
    }

    fn count_key(&self, query: &Query) -> String {
        format!("{}:count:{}", self.collection, query.fingerprint())
    }

    fn invalidate_lists(&self) {
        self.cache.invalidate(&format!("{}:list:*", self.collection));
        self.cache.invalidate(&format!("{}:count:*", self.collection));
    }

    // == Create ==
    /// Writes a new document, generating an id when none is given.
    ///
    /// `createdAt` and `updatedAt` are stamped with the current UTC time.
    pub async fn create(&self, data: Value, id: Option<&str>) -> Result<Document> {
        let Value::Object(mut fields) = data else {
            return Err(StoreError::InvalidQuery("document body must be a JSON object".into()).into());
        };

        let id = id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        let now = Value::String(chrono::Utc::now().to_rfc3339());
        fields.insert("createdAt".to_string(), now.clone());
        fields.insert("updatedAt".to_string(), now);
        let body = Value::Object(fields);

        self.retry
            .run("create", || self.store.set(&self.collection, &id, body.clone()))
            .await?;

        let document = Document::new(id, body);
        self.cache.set_with_ttl(
            self.document_key(&document.id),
            serde_json::to_value(&document)?,
            self.ttl,
        );
        self.invalidate_lists();
        debug!("Created {}/{}", self.collection, document.id);
        Ok(document)
    }

    // == Find By Id ==
    /// Cache-first point read. Missing documents are not cached.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        let key = self.document_key(id);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(Some(serde_json::from_value(cached)?));
        }

        let found = self
            .retry
            .run("find_by_id", || self.store.get(&self.collection, id))
            .await?;

        if let Some(document) = &found {
            self.cache
                .set_with_ttl(key, serde_json::to_value(document)?, self.ttl);
        }
        Ok(found)
    }

    // == Update ==
    /// Merges `patch` into the document and returns the fresh copy.
    pub async fn update(&self, id: &str, patch: Value) -> Result<Document> {
        let Value::Object(mut fields) = patch else {
            return Err(StoreError::InvalidQuery("update patch must be a JSON object".into()).into());
        };
        fields.insert(
            "updatedAt".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        let patch = Value::Object(fields);

        self.retry
            .run("update", || self.store.update(&self.collection, id, patch.clone()))
            .await?;

        // Drop stale copies before reading back
        self.cache.delete(&self.document_key(id));
        self.invalidate_lists();

        self.find_by_id(id).await?.ok_or_else(|| {
            CacheError::Store(StoreError::NotFound(format!("{}/{}", self.collection, id)))
        })
    }

    // == Delete ==
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.retry
            .run("delete", || self.store.delete(&self.collection, id))
            .await?;

        self.cache.delete(&self.document_key(id));
        self.invalidate_lists();
        debug!("Deleted {}/{}", self.collection, id);
        Ok(())
    }

    // == Find Many ==
    /// Cache-first list read.
    pub async fn find_many(&self, options: &ListOptions) -> Result<Vec<Document>> {
        let query = options.to_query(&self.collection);
        let key = self.list_key(&query);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(serde_json::from_value(cached)?);
        }

        let documents = self
            .retry
            .run("find_many", || self.store.query(&query))
            .await?;

        self.cache
            .set_with_ttl(key, serde_json::to_value(&documents)?, self.ttl);
        Ok(documents)
    }

    // == Find Many Paginated ==
    /// Offset pagination over the cached list. Pages are 1-based; page 0 is
    /// treated as page 1 and a zero page size as 1.
    pub async fn find_many_paginated(
        &self,
        page: usize,
        page_size: usize,
        options: &ListOptions,
    ) -> Result<PaginatedResult> {
        let page = page.max(1);
        let page_size = page_size.max(1);

        let query = options.to_query(&self.collection);
        let all = self.find_many(options).await?;

        let count_key = self.count_key(&query);
        let total = match self.cache.get(&count_key).and_then(|v| v.as_u64()) {
            Some(total) => total as usize,
            None => {
                self.cache
                    .set_with_ttl(count_key, Value::from(all.len()), self.ttl);
                all.len()
            }
        };

        let items = all
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        Ok(PaginatedResult {
            items,
            page,
            page_size,
            total,
            total_pages: total.div_ceil(page_size),
        })
    }

    /// Drops every cached key of this collection.
    pub fn invalidate_all(&self) -> usize {
        self.cache.invalidate(&format!("{}:*", self.collection))
    }
}
