//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check eviction, expiry, invalidation and stats behavior
//! over generated operation sequences.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{keys, TtlCache};
use crate::clock::ManualClock;
use crate::config::CacheOptions;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_DEFAULT_TTL_MS: u64 = 300_000;

fn new_cache(max_size: usize) -> (TtlCache<String>, ManualClock) {
    let clock = ManualClock::new(1_700_000_000_000);
    let options = CacheOptions::new(Duration::from_millis(TEST_DEFAULT_TTL_MS), max_size);
    (TtlCache::with_clock(options, Arc::new(clock.clone())), clock)
}

// == Strategies ==
/// Generates cache keys, including the empty key
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9:_]{0,24}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}"
}

/// Distinct keys in insertion order
fn unique_keys(min: usize, max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{1,12}", min..max).prop_map(|set| set.into_iter().collect())
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Advance { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
        (0u64..200_000).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hits and misses reported by stats match what `get` returned.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (mut cache, clock) = new_cache(TEST_MAX_ENTRIES);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => cache.set(key, value),
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    cache.delete(&key);
                }
                CacheOp::Advance { ms } => clock.advance(Duration::from_millis(ms)),
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.size, cache.len(), "Size mismatch");
        prop_assert_eq!(stats.entries.len(), cache.len(), "Entry listing mismatch");
    }

    // The last value written to a key is the one read back before expiry.
    #[test]
    fn prop_matches_reference_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        // Large enough that nothing is evicted
        let (mut cache, clock) = new_cache(1_000);
        let mut model: HashMap<String, (String, u64)> = HashMap::new();
        let mut now = 1_700_000_000_000u64;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    model.insert(key.clone(), (value.clone(), now + TEST_DEFAULT_TTL_MS));
                    cache.set(key, value);
                }
                CacheOp::Get { key } => {
                    let expected = model
                        .get(&key)
                        .filter(|(_, expires)| now <= *expires)
                        .map(|(value, _)| value.clone());
                    prop_assert_eq!(cache.get(&key).cloned(), expected);
                }
                CacheOp::Delete { key } => {
                    model.remove(&key);
                    cache.delete(&key);
                    prop_assert!(!cache.has(&key));
                }
                CacheOp::Advance { ms } => {
                    now += ms;
                    clock.advance(Duration::from_millis(ms));
                }
            }
        }
    }

    // The number of entries never exceeds max_size.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..200)
    ) {
        let max_entries = 20;
        let (mut cache, _) = new_cache(max_entries);

        for (key, value) in entries {
            cache.set(key, value);
            prop_assert!(
                cache.len() <= max_entries,
                "Cache size {} exceeds max {}",
                cache.len(),
                max_entries
            );
        }
    }

    // Filling to capacity and adding one more evicts the first key.
    #[test]
    fn prop_lru_eviction_order(keys in unique_keys(2, 12), new_value in value_strategy()) {
        let capacity = keys.len();
        let (mut cache, _) = new_cache(capacity);

        for key in &keys {
            cache.set(key.clone(), format!("value_{}", key));
        }
        let new_key = format!("{}_new", keys.concat());
        cache.set(new_key.clone(), new_value);

        prop_assert_eq!(cache.len(), capacity);
        prop_assert!(!cache.has(&keys[0]), "Oldest key should have been evicted");
        prop_assert!(cache.has(&new_key));
        for key in keys.iter().skip(1) {
            prop_assert!(cache.has(key), "Key '{}' should still exist", key);
        }
    }

    // A key read just before an insertion into a full cache survives it.
    #[test]
    fn prop_lru_access_tracking(keys in unique_keys(3, 10), access_index in 0usize..100) {
        let capacity = keys.len();
        let (mut cache, _) = new_cache(capacity);

        for key in &keys {
            cache.set(key.clone(), key.clone());
        }

        let accessed = access_index % capacity;
        prop_assert!(cache.get(&keys[accessed]).is_some());

        cache.set(format!("{}_new", keys.concat()), "fresh".to_string());

        let expected_evicted = if accessed == 0 { 1 } else { 0 };
        prop_assert!(cache.has(&keys[accessed]), "Accessed key was evicted");
        prop_assert!(!cache.has(&keys[expected_evicted]), "Wrong key evicted");
    }

    // Wildcard invalidation removes exactly one family.
    #[test]
    fn prop_wildcard_invalidate(
        user_ids in prop::collection::hash_set("[a-z0-9]{1,8}", 0..10),
        club_ids in prop::collection::hash_set("[a-z0-9]{1,8}", 0..10),
    ) {
        let (mut cache, _) = new_cache(TEST_MAX_ENTRIES);
        for id in &user_ids {
            cache.set(keys::user(id), id.clone());
        }
        for id in &club_ids {
            cache.set(keys::club(id), id.clone());
        }

        let removed = cache.invalidate(&keys::family(keys::USER_PREFIX));

        prop_assert_eq!(removed, user_ids.len());
        prop_assert_eq!(cache.len(), club_ids.len());
        for id in &club_ids {
            prop_assert!(cache.has(&keys::club(id)));
        }
    }
}

// Separate block for TTL properties
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // After `ttl + 1` ms an entry is gone from both `get` and `has`.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in key_strategy(),
        value in value_strategy(),
        ttl_ms in 1u64..1_000_000,
    ) {
        let (mut cache, clock) = new_cache(TEST_MAX_ENTRIES);
        cache.set_with_ttl(key.clone(), value.clone(), Duration::from_millis(ttl_ms));

        clock.advance(Duration::from_millis(ttl_ms));
        prop_assert_eq!(cache.get(&key).cloned(), Some(value));

        clock.advance(Duration::from_millis(1));
        prop_assert!(!cache.has(&key));
        prop_assert!(cache.get(&key).is_none());
    }

    // `cleanup` removes exactly the expired entries.
    #[test]
    fn prop_cleanup_sweeps_expired(
        ttls in prop::collection::vec(1u64..10_000, 1..40),
        elapsed in 0u64..10_000,
    ) {
        let (mut cache, clock) = new_cache(TEST_MAX_ENTRIES);
        for (i, ttl) in ttls.iter().enumerate() {
            cache.set_with_ttl(keys::member(&i.to_string()), i.to_string(), Duration::from_millis(*ttl));
        }

        clock.advance(Duration::from_millis(elapsed));
        let expected_removed = ttls.iter().filter(|ttl| elapsed > **ttl).count();

        prop_assert_eq!(cache.cleanup(), expected_removed);
        prop_assert_eq!(cache.len(), ttls.len() - expected_removed);
    }
}
