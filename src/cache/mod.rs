//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction.

mod entry;
pub mod keys;
mod lru;
mod named;
mod pattern;
mod shared;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use named::{CacheKind, ClearTarget, NamedCacheStats, NamedCaches};
pub use pattern::KeyPattern;
pub use shared::SharedCache;
pub use stats::{CacheStats, CacheStatsSnapshot, EntryInfo};
pub use store::TtlCache;
