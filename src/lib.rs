//! Club Cache - in-process caching layer for a club management backend
//!
//! Bounded TTL caches with LRU eviction, memoized fetches, cached document
//! repositories and a cursor paginator, all in front of an async document
//! store.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod memo;
pub mod pagination;
pub mod repository;
pub mod store;
pub mod tasks;
pub mod telemetry;

pub use cache::{CacheKind, CacheStatsSnapshot, ClearTarget, NamedCaches, SharedCache, TtlCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CacheOptions};
pub use error::{CacheError, Result, StoreError};
pub use memo::{with_cache, Memoized};
pub use pagination::{PageMode, PageState, Paginator, PaginatorOptions};
pub use repository::{CachedRepository, ListOptions, PaginatedResult, RetryPolicy};
pub use store::{DocumentStore, InMemoryDocumentStore, Query};
pub use tasks::{CleanupHandle, CleanupTask, Sweep};
pub use telemetry::init_tracing;
