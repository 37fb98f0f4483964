//! Cursor Pagination Module
//!
//! Stateful cursor paginator over an ordered collection. Each fetched page is
//! kept in a shared cache under `page:{query digest}:{cursor}` so revisiting a
//! page does not hit the store until the entry expires or `refresh` runs.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::{keys, SharedCache};
use crate::error::{Result, StoreError};
use crate::store::{Cursor, Document, DocumentMarker, DocumentStore, Query};

// == Options ==
/// What `load_next_page` does with the new batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageMode {
    /// Infinite list: new pages are appended and navigation is forward only
    #[default]
    Append,
    /// Paged table: each load replaces the data
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginatorOptions {
    pub page_size: usize,
    pub mode: PageMode,
    /// A disabled paginator never fetches
    pub enabled: bool,
    /// TTL for cached pages; `None` uses the cache default
    pub cache_ttl: Option<Duration>,
}

impl Default for PaginatorOptions {
    fn default() -> Self {
        Self {
            page_size: 50,
            mode: PageMode::Append,
            enabled: true,
            cache_ttl: None,
        }
    }
}

// == Page State ==
/// Snapshot of everything a view needs to render the paginated list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageState {
    pub data: Vec<Document>,
    pub loading: bool,
    pub error: Option<StoreError>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    /// 1-based; 0 until the first page is loaded
    pub current_page: usize,
    pub total_loaded: usize,
}

// == Paginator ==
pub struct Paginator {
    store: Arc<dyn DocumentStore>,
    cache: SharedCache<Value>,
    /// Base query with the page size applied as its limit
    query: Query,
    options: PaginatorOptions,
    first: Option<DocumentMarker>,
    last: Option<DocumentMarker>,
    state: watch::Sender<PageState>,
}

impl Paginator {
    /// Creates an empty paginator. Nothing is fetched until `refresh`.
    ///
    /// A zero page size is raised to 1. Any limit or cursor on `query` is
    /// replaced.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: SharedCache<Value>,
        query: Query,
        options: PaginatorOptions,
    ) -> Self {
        let options = PaginatorOptions {
            page_size: options.page_size.max(1),
            ..options
        };
        let (state, _) = watch::channel(PageState::default());
        Self {
            store,
            cache,
            query: Self::base_query(query, options.page_size),
            options,
            first: None,
            last: None,
            state,
        }
    }

    fn base_query(query: Query, page_size: usize) -> Query {
        Query {
            cursor: None,
            limit: Some(page_size),
            ..query
        }
    }

    // == Observers ==
    /// Current state.
    pub fn state(&self) -> PageState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every state change, including `loading` toggles.
    pub fn subscribe(&self) -> watch::Receiver<PageState> {
        self.state.subscribe()
    }

    pub fn options(&self) -> PaginatorOptions {
        self.options
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.options.enabled = enabled;
    }

    /// Swaps the base query and resets to the empty state without fetching.
    pub fn set_query(&mut self, query: Query) {
        self.query = Self::base_query(query, self.options.page_size);
        self.first = None;
        self.last = None;
        self.state.send_replace(PageState::default());
    }

    // == Refresh ==
    /// Drops this query's cached pages and loads page one.
    pub async fn refresh(&mut self) -> Result<()> {
        if !self.options.enabled {
            return Ok(());
        }

        let removed = self.cache.invalidate(&keys::pages_of(&self.query.digest()));
        debug!("Paginator refresh on {} ({} cached pages dropped)", self.query.collection, removed);
        self.first = None;
        self.last = None;

        let docs = match self.load(None).await {
            Ok(docs) => docs,
            Err(err) => {
                // No markers left, so the held page must go too
                self.state.send_modify(|state| {
                    state.data.clear();
                    state.has_next_page = false;
                    state.has_previous_page = false;
                    state.current_page = 0;
                    state.total_loaded = 0;
                });
                return Err(err);
            }
        };
        let page_size = self.options.page_size;
        self.first = docs.first().map(Document::marker);
        self.last = docs.last().map(Document::marker);
        self.state.send_modify(|state| {
            state.has_next_page = docs.len() == page_size;
            state.has_previous_page = false;
            state.current_page = 1;
            state.total_loaded = docs.len();
            state.data = docs;
        });
        Ok(())
    }

    // == Load Next Page ==
    /// Loads the page after the last loaded document.
    ///
    /// No-op when there is no next page, nothing is loaded yet, or the
    /// paginator is disabled.
    pub async fn load_next_page(&mut self) -> Result<()> {
        let Some(last) = self.last.clone() else {
            return Ok(());
        };
        if !self.options.enabled || !self.state.borrow().has_next_page {
            return Ok(());
        }

        let docs = self.load(Some(Cursor::StartAfter(last))).await?;
        if docs.is_empty() {
            debug!("Paginator on {} reached the end", self.query.collection);
            self.state.send_modify(|state| state.has_next_page = false);
            return Ok(());
        }

        let page_size = self.options.page_size;
        let mode = self.options.mode;
        self.last = docs.last().map(Document::marker);
        if mode == PageMode::Replace {
            self.first = docs.first().map(Document::marker);
        }
        self.state.send_modify(|state| {
            state.has_next_page = docs.len() == page_size;
            state.current_page += 1;
            match mode {
                PageMode::Append => state.data.extend(docs),
                PageMode::Replace => {
                    state.data = docs;
                    state.has_previous_page = true;
                }
            }
            state.total_loaded = state.data.len();
        });
        Ok(())
    }

    // == Load Previous Page ==
    /// Loads the page before the first held document. Only available in
    /// [`PageMode::Replace`]; append mode keeps earlier pages in memory.
    pub async fn load_previous_page(&mut self) -> Result<()> {
        let Some(first) = self.first.clone() else {
            return Ok(());
        };
        if !self.options.enabled || !self.state.borrow().has_previous_page {
            return Ok(());
        }

        let docs = self.load(Some(Cursor::EndBefore(first))).await?;
        if docs.is_empty() {
            self.state.send_modify(|state| state.has_previous_page = false);
            return Ok(());
        }

        self.first = docs.first().map(Document::marker);
        self.last = docs.last().map(Document::marker);
        self.state.send_modify(|state| {
            state.current_page = state.current_page.saturating_sub(1).max(1);
            state.has_previous_page = state.current_page > 1;
            state.has_next_page = true;
            state.total_loaded = docs.len();
            state.data = docs;
        });
        Ok(())
    }

    // == Fetching ==
    /// Fetches one page, bracketing the call with the `loading` flag and
    /// recording a failure in the state.
    async fn load(&self, cursor: Option<Cursor>) -> Result<Vec<Document>> {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = self.fetch_page(cursor).await;

        self.state.send_modify(|state| {
            state.loading = false;
            if let Err(err) = &result {
                state.error = Some(err.clone());
            }
        });
        if let Err(err) = &result {
            warn!("Page fetch on {} failed: {}", self.query.collection, err);
        }
        result.map_err(Into::into)
    }

    async fn fetch_page(&self, cursor: Option<Cursor>) -> std::result::Result<Vec<Document>, StoreError> {
        let key = keys::page(
            &self.query.digest(),
            &cursor.as_ref().map_or_else(|| "first".to_string(), Cursor::key),
        );

        if let Some(cached) = self.cache.get(&key) {
            match serde_json::from_value::<Vec<Document>>(cached) {
                Ok(docs) => {
                    debug!("Page cache hit: {}", key);
                    return Ok(docs);
                }
                Err(err) => {
                    warn!("Dropping unreadable cached page {}: {}", key, err);
                    self.cache.delete(&key);
                }
            }
        }

        let query = Query {
            cursor,
            ..self.query.clone()
        };
        let docs = self.store.query(&query).await?;

        match serde_json::to_value(&docs) {
            Ok(value) => match self.options.cache_ttl {
                Some(ttl) => self.cache.set_with_ttl(key, value, ttl),
                None => self.cache.set(key, value),
            },
            Err(err) => warn!("Page {} not cached: {}", key, err),
        }
        Ok(docs)
    }
}
