//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL expiration.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, CacheStatsSnapshot, EntryInfo, KeyPattern, LruTracker};
use crate::clock::{system_clock, SharedClock};
use crate::config::CacheOptions;

// == TTL Cache ==
/// Bounded in-memory cache with per-entry TTL and LRU eviction.
///
/// Expired entries are dropped lazily by `get`/`has` and eagerly by
/// `cleanup`. No operation fails for missing, expired or empty keys.
pub struct TtlCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed, at least 1
    max_size: usize,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
    clock: SharedClock,
}

impl<V> TtlCache<V> {
    // == Constructor ==
    /// Creates a cache on the wall clock.
    pub fn new(options: CacheOptions) -> Self {
        Self::with_clock(options, system_clock())
    }

    /// Creates a cache reading time from `clock`.
    ///
    /// A `max_size` of zero is clamped to one.
    pub fn with_clock(options: CacheOptions, clock: SharedClock) -> Self {
        let max_size = if options.max_size == 0 {
            warn!("Cache max_size of 0 requested, clamping to 1");
            1
        } else {
            options.max_size
        };

        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_size,
            default_ttl: options.ttl,
            clock,
        }
    }

    // == Set ==
    /// Stores a value under `key` with the default TTL.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let ttl = self.default_ttl;
        self.set_with_ttl(key, value, ttl);
    }

    /// Stores a value under `key` for `ttl`.
    ///
    /// Overwriting resets both timestamps and recency. Inserting a new key
    /// into a full cache evicts the least recently used entry first. A zero
    /// TTL means the default TTL.
    pub fn set_with_ttl(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let ttl = if ttl.is_zero() { self.default_ttl } else { ttl };

        let is_overwrite = self.entries.contains_key(&key);
        if !is_overwrite && self.entries.len() >= self.max_size {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
                debug!("Evicted least recently used key {:?}", evicted);
            }
        }

        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl);
        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key);
    }

    // == Get ==
    /// Returns the live value for `key` and marks it most recently used.
    ///
    /// `None` means absent or expired; expired entries are removed here.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        if !self.is_live(key) {
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        self.lru.touch(key);
        self.entries.get(key).map(|entry| &entry.value)
    }

    // == Has ==
    /// Returns whether a live entry exists, without touching recency.
    pub fn has(&mut self, key: &str) -> bool {
        self.is_live(key)
    }

    // == Delete ==
    /// Removes `key`, reporting whether anything was there.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Invalidate ==
    /// Deletes every key matching a `*` wildcard pattern.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&mut self, pattern: &str) -> usize {
        let pattern = KeyPattern::new(pattern);
        let matched: Vec<String> = self
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();

        for key in &matched {
            self.remove_entry(key);
        }

        if !matched.is_empty() {
            debug!("Invalidated {} cache entries", matched.len());
        }
        matched.len()
    }

    // == Cleanup ==
    /// Removes all expired entries; survivors keep their recency order.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired.len());
        expired.len()
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Stats ==
    /// Returns a snapshot with entries from least to most recently used.
    pub fn stats(&self) -> CacheStatsSnapshot {
        let entries = self
            .lru
            .iter()
            .filter_map(|key| {
                self.entries.get(key).map(|entry| EntryInfo {
                    key: key.to_string(),
                    inserted_at: entry.inserted_at,
                    expires_at: entry.expires_at,
                })
            })
            .collect();

        CacheStatsSnapshot {
            size: self.entries.len(),
            max_size: self.max_size,
            hits: self.stats.hits,
            misses: self.stats.misses,
            evictions: self.stats.evictions,
            expirations: self.stats.expirations,
            hit_rate: self.stats.hit_rate(),
            entries,
        }
    }

    /// Drops `key` if expired and reports whether a live entry remains.
    fn is_live(&mut self, key: &str) -> bool {
        let now = self.clock.now_ms();
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
        }
        !expired
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }
}

impl<V> fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("len", &self.entries.len())
            .field("max_size", &self.max_size)
            .field("default_ttl", &self.default_ttl)
            .field("stats", &self.stats)
            .finish()
    }
}
