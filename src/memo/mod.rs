//! Memoization Module
//!
//! Wraps an async fetch function with a private TTL cache. Concurrent calls
//! for the same key share a single in-flight fetch; `None` results and
//! errors are handed back to every waiter but never stored.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheStatsSnapshot, KeyPattern, TtlCache};
use crate::clock::{system_clock, SharedClock};
use crate::config::CacheOptions;

type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<Option<V>, E>>>;

// == Slot ==
/// What a key currently resolves to inside a memoizer.
enum Slot<V, E> {
    /// Nothing cached, nothing running
    Empty,
    /// A fetch is running; await it instead of starting another
    Pending(SharedFetch<V, E>),
    /// Live cached value
    Ready(V),
}

struct InFlight<V, E> {
    /// Distinguishes this fetch from a later one for the same key
    id: u64,
    fetch: SharedFetch<V, E>,
}

struct MemoState<V, E> {
    cache: TtlCache<V>,
    in_flight: HashMap<String, InFlight<V, E>>,
    next_fetch_id: u64,
}

impl<V: Clone, E> MemoState<V, E> {
    fn lookup(&mut self, key: &str) -> Slot<V, E> {
        if let Some(flight) = self.in_flight.get(key) {
            return Slot::Pending(flight.fetch.clone());
        }
        match self.cache.get(key) {
            Some(value) => Slot::Ready(value.clone()),
            None => Slot::Empty,
        }
    }
}

// == Memoized ==
/// An async function with a dedicated result cache.
///
/// Built with [`with_cache`] or [`Memoized::new`]. Each wrapper owns its
/// cache; wrappers never share entries.
pub struct Memoized<A, V, E, F, K> {
    fetch: F,
    key_fn: K,
    state: Arc<Mutex<MemoState<V, E>>>,
    _args: PhantomData<fn(A)>,
}

/// Wraps `fetch` so repeated calls with equal keys are served from memory.
pub fn with_cache<A, V, E, F, Fut, K>(
    fetch: F,
    key_fn: K,
    options: CacheOptions,
) -> Memoized<A, V, E, F, K>
where
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<Option<V>, E>> + Send + 'static,
    K: Fn(&A) -> String,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    Memoized::new(fetch, key_fn, options)
}

impl<A, V, E, F, Fut, K> Memoized<A, V, E, F, K>
where
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<Option<V>, E>> + Send + 'static,
    K: Fn(&A) -> String,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new(fetch: F, key_fn: K, options: CacheOptions) -> Self {
        Self::with_clock(fetch, key_fn, options, system_clock())
    }

    pub fn with_clock(fetch: F, key_fn: K, options: CacheOptions, clock: SharedClock) -> Self {
        Self {
            fetch,
            key_fn,
            state: Arc::new(Mutex::new(MemoState {
                cache: TtlCache::with_clock(options, clock),
                in_flight: HashMap::new(),
                next_fetch_id: 0,
            })),
            _args: PhantomData,
        }
    }

    // == Call ==
    /// Returns the cached value for `args`' key, or fetches it.
    ///
    /// If a fetch for the same key is already running, waits for that one.
    pub async fn call(&self, args: A) -> Result<Option<V>, E> {
        let key = (self.key_fn)(&args);

        let pending = {
            let mut state = self.state.lock();
            match state.lookup(&key) {
                Slot::Ready(value) => return Ok(Some(value)),
                Slot::Pending(fetch) => {
                    debug!("Joining in-flight fetch for {:?}", key);
                    fetch
                }
                Slot::Empty => {
                    let id = state.next_fetch_id;
                    state.next_fetch_id += 1;
                    let fetch = self.start_fetch(key.clone(), id, args);
                    state.in_flight.insert(
                        key,
                        InFlight {
                            id,
                            fetch: fetch.clone(),
                        },
                    );
                    fetch
                }
            }
        };

        pending.await
    }

    fn start_fetch(&self, key: String, id: u64, args: A) -> SharedFetch<V, E> {
        let fut = (self.fetch)(args);
        let state = Arc::clone(&self.state);

        async move {
            let result = fut.await;

            let mut guard = state.lock();
            // Invalidated while running: do not store or unregister a newer fetch
            let current = guard
                .in_flight
                .get(&key)
                .is_some_and(|flight| flight.id == id);
            if current {
                guard.in_flight.remove(&key);
                match &result {
                    Ok(Some(value)) => guard.cache.set(key, value.clone()),
                    Ok(None) => debug!("Fetch for {:?} returned nothing, not caching", key),
                    Err(_) => warn!("Fetch for {:?} failed, not caching", key),
                }
            }
            result
        }
        .boxed()
        .shared()
    }
}

impl<A, V, E, F, K> Memoized<A, V, E, F, K> {
    /// Forgets `key`, including any fetch still running for it.
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let was_running = state.in_flight.remove(key).is_some();
        state.cache.delete(key) || was_running
    }

    /// Forgets every key matching a `*` wildcard pattern.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let mut state = self.state.lock();
        let matcher = KeyPattern::new(pattern);
        state.in_flight.retain(|key, _| !matcher.matches(key));
        state.cache.invalidate(pattern)
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.in_flight.clear();
        state.cache.clear();
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.state.lock().cache.stats()
    }

    /// Number of fetches currently running.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }
}

impl<A, V, E, F, K> fmt::Debug for Memoized<A, V, E, F, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Memoized")
            .field("cache", &state.cache)
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::StoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn options() -> CacheOptions {
        CacheOptions::new(Duration::from_secs(60), 10)
    }

    #[tokio::test]
    async fn test_repeated_call_hits_cache() {
        let calls = counter();
        let seen = calls.clone();
        let club_name = with_cache(
            move |id: u32| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, StoreError>(Some(format!("club-{}", id)))
                }
            },
            |id| format!("club:{}", id),
            options(),
        );

        assert_eq!(club_name.call(1).await.unwrap().as_deref(), Some("club-1"));
        assert_eq!(club_name.call(1).await.unwrap().as_deref(), Some("club-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(club_name.call(2).await.unwrap().as_deref(), Some("club-2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(club_name.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_none_results_are_not_cached() {
        let calls = counter();
        let seen = calls.clone();
        let lookup = with_cache(
            move |_: &'static str| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok::<Option<u32>, StoreError>(None)
                }
            },
            |id| id.to_string(),
            options(),
        );

        assert_eq!(lookup.call("ghost").await.unwrap(), None);
        assert_eq!(lookup.call("ghost").await.unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(lookup.stats().size, 0);
    }

    #[tokio::test]
    async fn test_errors_propagate_and_are_not_cached() {
        let calls = counter();
        let seen = calls.clone();
        let flaky = with_cache(
            move |_: ()| {
                let seen = seen.clone();
                async move {
                    let n = seen.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err(StoreError::Unavailable("offline".into()))
                    } else {
                        Ok(Some(n))
                    }
                }
            },
            |_| "k".to_string(),
            options(),
        );

        assert_eq!(
            flaky.call(()).await,
            Err(StoreError::Unavailable("offline".into()))
        );
        assert_eq!(flaky.call(()).await, Ok(Some(1)));
        assert_eq!(flaky.call(()).await, Ok(Some(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let calls = counter();
        let seen = calls.clone();
        let slow = with_cache(
            move |id: u32| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok::<_, StoreError>(Some(id * 10))
                }
            },
            |id| id.to_string(),
            options(),
        );

        let (a, b, c) = tokio::join!(slow.call(4), slow.call(4), slow.call(4));

        assert_eq!((a, b, c), (Ok(Some(40)), Ok(Some(40)), Ok(Some(40))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(slow.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_shared_failure_reaches_every_waiter() {
        let calls = counter();
        let seen = calls.clone();
        let failing = with_cache(
            move |_: ()| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Err::<Option<u8>, _>(StoreError::Timeout("members".into()))
                }
            },
            |_| "members".to_string(),
            options(),
        );

        let (a, b) = tokio::join!(failing.call(()), failing.call(()));

        assert!(matches!(a, Err(StoreError::Timeout(_))));
        assert!(matches!(b, Err(StoreError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let clock = ManualClock::new(0);
        let calls = counter();
        let seen = calls.clone();
        let memo = Memoized::with_clock(
            move |_: ()| {
                let seen = seen.clone();
                async move { Ok::<_, StoreError>(Some(seen.fetch_add(1, Ordering::SeqCst))) }
            },
            |_| "k".to_string(),
            CacheOptions::new(Duration::from_millis(100), 10),
            Arc::new(clock.clone()),
        );

        assert_eq!(memo.call(()).await, Ok(Some(0)));
        clock.advance(Duration::from_millis(100));
        assert_eq!(memo.call(()).await, Ok(Some(0)));
        clock.advance(Duration::from_millis(1));
        assert_eq!(memo.call(()).await, Ok(Some(1)));
    }

    #[tokio::test]
    async fn test_invalidate_during_fetch_discards_result() {
        let memo = Arc::new(with_cache(
            |id: u32| async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok::<_, StoreError>(Some(id))
            },
            |id| format!("member:{}", id),
            options(),
        ));

        let running = {
            let memo = Arc::clone(&memo);
            tokio::spawn(async move { memo.call(7).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(memo.in_flight(), 1);

        assert_eq!(memo.invalidate("member:*"), 0);
        assert_eq!(memo.in_flight(), 0);

        assert_eq!(running.await.unwrap(), Ok(Some(7)));
        assert_eq!(memo.stats().size, 0);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let memo = with_cache(
            |id: u32| async move { Ok::<_, StoreError>(Some(id)) },
            |id| id.to_string(),
            options(),
        );

        memo.call(1).await.unwrap();
        memo.call(2).await.unwrap();
        assert!(memo.delete("1"));
        assert!(!memo.delete("1"));
        assert_eq!(memo.stats().size, 1);

        memo.clear();
        assert_eq!(memo.stats().size, 0);
    }

    proptest::proptest! {
        // Fetch runs once per distinct key as long as everything fits.
        #[test]
        fn prop_fetch_once_per_distinct_key(ids in proptest::collection::vec(0u32..20, 1..60)) {
            let calls = counter();
            let seen = calls.clone();
            let memo = with_cache(
                move |id: u32| {
                    let seen = seen.clone();
                    async move {
                        seen.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, StoreError>(Some(id * 2))
                    }
                },
                |id| format!("member:{}", id),
                CacheOptions::new(Duration::from_secs(60), 20),
            );

            for id in &ids {
                let value = tokio_test::block_on(memo.call(*id));
                proptest::prop_assert_eq!(value, Ok(Some(id * 2)));
            }

            let distinct: std::collections::HashSet<_> = ids.iter().collect();
            proptest::prop_assert_eq!(calls.load(Ordering::SeqCst), distinct.len());
            proptest::prop_assert_eq!(memo.stats().hits as usize, ids.len() - distinct.len());
        }
    }
}
