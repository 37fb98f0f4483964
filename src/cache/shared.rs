//! Shared Cache Module
//!
//! Cheap-clone handle over a single `TtlCache` so one instance can be read
//! and written from many tasks.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::cache::{CacheStatsSnapshot, TtlCache};
use crate::clock::SharedClock;
use crate::config::CacheOptions;

// == Shared Cache ==
/// Clonable handle to one cache instance.
///
/// Each call takes the lock for the duration of one synchronous operation,
/// so operations never suspend and are atomic with respect to each other.
#[derive(Debug)]
pub struct SharedCache<V> {
    inner: Arc<Mutex<TtlCache<V>>>,
}

impl<V> Clone for SharedCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone> SharedCache<V> {
    pub fn new(options: CacheOptions) -> Self {
        Self::from_cache(TtlCache::new(options))
    }

    pub fn with_clock(options: CacheOptions, clock: SharedClock) -> Self {
        Self::from_cache(TtlCache::with_clock(options, clock))
    }

    pub fn from_cache(cache: TtlCache<V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Returns a clone of the live value for `key`, promoting it.
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.inner.lock().set(key, value);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.inner.lock().set_with_ttl(key, value, ttl);
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.lock().has(key)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().delete(key)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn invalidate(&self, pattern: &str) -> usize {
        self.inner.lock().invalidate(pattern)
    }

    pub fn cleanup(&self) -> usize {
        self.inner.lock().cleanup()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.inner.lock().stats()
    }

    /// Returns true if both handles point at the same instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_clones_share_entries() {
        let cache: SharedCache<u32> =
            SharedCache::new(CacheOptions::new(Duration::from_secs(60), 10));
        let other = cache.clone();

        cache.set("club:1", 7);

        assert_eq!(other.get("club:1"), Some(7));
        assert!(cache.same_instance(&other));
        assert!(other.delete("club:1"));
        assert!(!cache.has("club:1"));
    }

    #[test]
    fn test_separate_instances_do_not_share() {
        let a: SharedCache<u32> = SharedCache::new(CacheOptions::default());
        let b: SharedCache<u32> = SharedCache::new(CacheOptions::default());

        a.set("k", 1);

        assert_eq!(b.get("k"), None);
        assert!(!a.same_instance(&b));
    }

    #[test]
    fn test_ttl_through_handle() {
        let clock = ManualClock::new(0);
        let cache: SharedCache<&'static str> = SharedCache::with_clock(
            CacheOptions::new(Duration::from_millis(100), 10),
            Arc::new(clock.clone()),
        );

        cache.set_with_ttl("member:1", "Kim", Duration::from_millis(50));
        cache.set("member:2", "Lee");
        clock.advance(Duration::from_millis(51));

        assert_eq!(cache.get("member:1"), None);
        assert_eq!(cache.get("member:2"), Some("Lee"));
        clock.advance(Duration::from_millis(50));
        assert_eq!(cache.cleanup(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_tasks_share_one_instance() {
        let cache: SharedCache<usize> =
            SharedCache::new(CacheOptions::new(Duration::from_secs(60), 1_000));

        let handles: Vec<_> = (0..8)
            .map(|task| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    for i in 0..50 {
                        cache.set(format!("task{}:{}", task, i), i);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len(), 400);
        assert_eq!(cache.invalidate("task3:*"), 50);
    }
}
