//! Document Store Module
//!
//! The backing document database as seen by the caching layer: point reads,
//! ordered/limited queries with cursors, and writes.

mod memory;
mod query;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub use memory::InMemoryDocumentStore;
pub use query::{Cursor, Direction, Document, DocumentMarker, Filter, FilterOp, OrderBy, Query};

/// Backing document database.
///
/// Implementations are pull-based: the caching layer never relies on push
/// notifications from the store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads one document, `None` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Runs a query. Results honour filters, ordering (ties broken by id),
    /// the cursor and the limit, in that order.
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Creates or replaces a document.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    /// Merges top-level fields of `patch` into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError>;

    /// Removes a document; removing a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
