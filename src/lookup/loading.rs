//! Single-flight load-through engine shared by the built-in cache types.
//!
//! Every key maps to one [`Slot`] in a sharded map: either a cached entry or
//! the in-flight marker of the load currently filling it. A caller that finds
//! no fresh entry either attaches to the existing marker or installs a new
//! one and becomes the leader of that load. The entry lock is only held to
//! inspect or swap the slot, never across an await, so unrelated keys (and
//! unrelated shards) never wait on each other.
//!
//! The leader runs the loader on its own task. Its outcome is first written
//! to the map (stored entry on success, marker removed on failure) and only
//! then broadcast to the coalesced callers, so any `get` starting after the
//! load completed observes the stored result.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::lookup::cache::Loader;
use crate::lookup::error::LookupError;
use crate::lookup::key::LookupKey;
use crate::lookup::result::LookupResult;

type Outcome = Result<LookupResult, LookupError>;

/// A full cache evicts `max_entries / EVICTION_HEADROOM_DIVISOR` entries
/// beyond its overflow.
const EVICTION_HEADROOM_DIVISOR: usize = 8;

/// Retention and eviction policy of a [`LoadingCache`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachePolicy {
    /// Keep successful results after the load completes.
    pub retain: bool,
    /// Upper bound on retained entries; least recently accessed go first.
    /// In-flight loads do not count towards it.
    pub max_entries: Option<usize>,
    pub expire_after_write: Option<Duration>,
    pub expire_after_access: Option<Duration>,
    /// Loads running longer than this fail with [`LookupError::Timeout`].
    pub load_timeout: Option<Duration>,
}

impl CachePolicy {
    /// Coalesces concurrent loads but keeps nothing afterwards.
    pub fn pass_through() -> Self {
        Self::default()
    }

    /// Retains results until evicted, purged or expired.
    pub fn retaining() -> Self {
        Self {
            retain: true,
            ..Self::default()
        }
    }
}

struct CachedEntry {
    result: LookupResult,
    expires_at: Option<Instant>,
    accessed_at: Instant,
}

impl CachedEntry {
    fn new(result: LookupResult, policy: &CachePolicy, now: Instant) -> Self {
        let ttl = match (policy.expire_after_write, result.cache_ttl()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            result,
            expires_at: ttl.map(|d| now + d),
            accessed_at: now,
        }
    }
}

enum Slot {
    Ready(CachedEntry),
    Loading {
        flight: u64,
        done: watch::Receiver<Option<Outcome>>,
    },
}

enum Found {
    Hit(LookupResult),
    Join(u64, watch::Receiver<Option<Outcome>>),
    Expired,
}

/// Shared between the engine and its load tasks.
struct Store {
    slots: DashMap<LookupKey, Slot>,
    /// Number of `Slot::Ready` entries. Changed only while the shard lock
    /// of the affected slot is held, before the slot becomes visible.
    ready: AtomicUsize,
    /// Set while one task is evicting; others skip rather than rescan.
    evicting: AtomicBool,
}

/// Keyed load-through store with single-flight loading.
pub struct LoadingCache {
    name: String,
    policy: CachePolicy,
    store: Arc<Store>,
    next_flight: AtomicU64,
}

impl LoadingCache {
    /// Creates an empty engine; `name` labels logs and metrics.
    pub fn new(name: impl Into<String>, policy: CachePolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            store: Arc::new(Store {
                slots: DashMap::new(),
                ready: AtomicUsize::new(0),
                evicting: AtomicBool::new(false),
            }),
            next_flight: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Returns the fresh entry for `key`, or the outcome of the single load
    /// that fills it.
    ///
    /// `loader` is dropped unused when the key is already cached or loading.
    pub async fn get(&self, key: &LookupKey, loader: Loader) -> Result<LookupResult, LookupError> {
        let now = Instant::now();

        let (flight, done, leader) = match self.store.slots.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let found = match occupied.get_mut() {
                    Slot::Ready(entry) if self.is_fresh(entry, now) => {
                        entry.accessed_at = now;
                        Found::Hit(entry.result.clone())
                    }
                    Slot::Loading { flight, done } => Found::Join(*flight, done.clone()),
                    Slot::Ready(_) => Found::Expired,
                };
                match found {
                    Found::Hit(result) => {
                        metrics::counter!("lookup_cache_hits_total", "cache" => self.name.clone())
                            .increment(1);
                        return Ok(result);
                    }
                    Found::Join(flight, done) => {
                        metrics::counter!("lookup_cache_coalesced_total", "cache" => self.name.clone())
                            .increment(1);
                        (flight, done, None)
                    }
                    Found::Expired => {
                        let (flight, tx, done) = self.new_flight();
                        occupied.insert(Slot::Loading {
                            flight,
                            done: done.clone(),
                        });
                        self.store.ready.fetch_sub(1, Ordering::AcqRel);
                        (flight, done, Some(tx))
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let (flight, tx, done) = self.new_flight();
                vacant.insert(Slot::Loading {
                    flight,
                    done: done.clone(),
                });
                (flight, done, Some(tx))
            }
        };

        if let Some(tx) = leader {
            metrics::counter!("lookup_cache_misses_total", "cache" => self.name.clone())
                .increment(1);
            self.spawn_load(key.clone(), flight, tx, loader);
        }

        self.wait(key, flight, done).await
    }

    /// Returns the fresh entry for `key` without loading.
    pub fn get_if_present(&self, key: &LookupKey) -> Option<LookupResult> {
        let now = Instant::now();
        let mut slot = self.store.slots.get_mut(key)?;
        match slot.value_mut() {
            Slot::Ready(entry) if self.is_fresh(entry, now) => {
                entry.accessed_at = now;
                Some(entry.result.clone())
            }
            _ => None,
        }
    }

    /// Drops every stored entry. In-flight markers stay so their waiters
    /// still get an outcome; those loads may store their result afterwards.
    pub fn purge(&self) {
        self.store.slots.retain(|_, slot| {
            let loading = matches!(slot, Slot::Loading { .. });
            if !loading {
                self.store.ready.fetch_sub(1, Ordering::AcqRel);
            }
            loading
        });
    }

    /// Drops the stored entry for `key`, leaving an in-flight load alone.
    pub fn purge_key(&self, key: &LookupKey) {
        self.store.remove_ready(key, |_| true);
    }

    /// Number of stored entries, fresh or not yet reclaimed.
    pub fn entry_count(&self) -> usize {
        self.store.ready.load(Ordering::Acquire)
    }

    fn is_fresh(&self, entry: &CachedEntry, now: Instant) -> bool {
        let written = entry.expires_at.is_none_or(|at| now < at);
        let accessed = self
            .policy
            .expire_after_access
            .is_none_or(|idle| now < entry.accessed_at + idle);
        written && accessed
    }

    fn new_flight(
        &self,
    ) -> (
        u64,
        watch::Sender<Option<Outcome>>,
        watch::Receiver<Option<Outcome>>,
    ) {
        let flight = self.next_flight.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(None);
        (flight, tx, rx)
    }

    fn spawn_load(
        &self,
        key: LookupKey,
        flight: u64,
        tx: watch::Sender<Option<Outcome>>,
        loader: Loader,
    ) {
        let store = Arc::clone(&self.store);
        let policy = self.policy.clone();
        let name = self.name.clone();
        let timeout = policy.load_timeout;

        metrics::counter!("lookup_cache_loads_total", "cache" => name.clone()).increment(1);
        debug!(cache = %name, key = %key, "Loading");

        tokio::spawn(async move {
            let load = async move {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, loader)
                        .await
                        .unwrap_or(Err(LookupError::Timeout(limit))),
                    None => loader.await,
                }
            };

            // A panicking loader surfaces as a JoinError instead of tearing
            // down this task and stranding the waiters.
            let outcome = match tokio::spawn(load).await {
                Ok(outcome) => outcome,
                Err(e) => Err(LookupError::Aborted(e.to_string())),
            };

            if let Err(e) = &outcome {
                metrics::counter!("lookup_cache_load_failures_total", "cache" => name.clone())
                    .increment(1);
                warn!(cache = %name, key = %key, error = %e, "Load failed");
            }

            if store.store_outcome(&policy, &key, flight, &outcome) {
                let evicted = store.evict_overflow(policy.max_entries, &key);
                if evicted > 0 {
                    metrics::counter!("lookup_cache_evictions_total", "cache" => name.clone())
                        .increment(evicted as u64);
                    debug!(cache = %name, evicted, "Evicted least recently accessed entries");
                }
            }
            tx.send_replace(Some(outcome));
        });
    }

    async fn wait(
        &self,
        key: &LookupKey,
        flight: u64,
        mut done: watch::Receiver<Option<Outcome>>,
    ) -> Result<LookupResult, LookupError> {
        match done.wait_for(Option::is_some).await {
            Ok(outcome) => outcome
                .clone()
                .unwrap_or_else(|| Err(LookupError::Aborted("no outcome published".into()))),
            Err(_) => {
                // The load task vanished without publishing (runtime shutdown).
                // Clear its marker so the next caller starts a fresh load.
                self.store.slots.remove_if(key, |_, slot| {
                    matches!(slot, Slot::Loading { flight: f, .. } if *f == flight)
                });
                Err(LookupError::Aborted("load task dropped".into()))
            }
        }
    }
}

impl Store {
    /// Replaces the marker of `flight` with the outcome (or removes it).
    /// Returns whether a result was stored.
    ///
    /// A marker that no longer belongs to `flight` is left untouched.
    fn store_outcome(
        &self,
        policy: &CachePolicy,
        key: &LookupKey,
        flight: u64,
        outcome: &Outcome,
    ) -> bool {
        let Entry::Occupied(mut occupied) = self.slots.entry(key.clone()) else {
            return false;
        };
        if !matches!(occupied.get(), Slot::Loading { flight: f, .. } if *f == flight) {
            return false;
        }

        match outcome {
            Ok(result) if policy.retain => {
                self.ready.fetch_add(1, Ordering::AcqRel);
                occupied.insert(Slot::Ready(CachedEntry::new(
                    result.clone(),
                    policy,
                    Instant::now(),
                )));
                true
            }
            _ => {
                occupied.remove();
                false
            }
        }
    }

    /// Removes the stored entry for `key` if `matches` accepts it.
    fn remove_ready(&self, key: &LookupKey, matches: impl Fn(&CachedEntry) -> bool) -> bool {
        let removed = self
            .slots
            .remove_if(key, |_, slot| match slot {
                Slot::Ready(entry) => matches(entry),
                Slot::Loading { .. } => false,
            })
            .is_some();
        if removed {
            self.ready.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }

    /// Brings the stored entries back under `max_entries`, least recently
    /// accessed first, and never evicts `keep`. Returns how many went.
    ///
    /// One pass removes the overflow plus an eighth of the bound, so a full
    /// cache is scanned once per batch of stores rather than on each one.
    fn evict_overflow(&self, max_entries: Option<usize>, keep: &LookupKey) -> usize {
        let Some(max) = max_entries else {
            return 0;
        };
        if self.ready.load(Ordering::Acquire) <= max {
            return 0;
        }
        if self
            .evicting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return 0;
        }

        let excess = self
            .ready
            .load(Ordering::Acquire)
            .saturating_sub(max)
            .saturating_add(max / EVICTION_HEADROOM_DIVISOR);
        let mut candidates: Vec<(LookupKey, Instant)> = self
            .slots
            .iter()
            .filter(|slot| slot.key() != keep)
            .filter_map(|slot| match slot.value() {
                Slot::Ready(entry) => Some((slot.key().clone(), entry.accessed_at)),
                Slot::Loading { .. } => None,
            })
            .collect();

        let take = excess.min(candidates.len());
        if take > 0 && take < candidates.len() {
            candidates.select_nth_unstable_by_key(take - 1, |(_, accessed_at)| *accessed_at);
        }

        let mut evicted = 0;
        for (key, seen) in candidates.into_iter().take(take) {
            // Skip entries read since the scan; they are no longer the oldest.
            if self.remove_ready(&key, |entry| entry.accessed_at == seen) {
                evicted += 1;
            }
        }

        self.evicting.store(false, Ordering::Release);
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::cache::loader;
    use tokio::sync::Barrier;

    fn counting(calls: &Arc<AtomicUsize>, value: &str, delay: Duration) -> Loader {
        let calls = Arc::clone(calls);
        let value = value.to_string();
        loader(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            Ok(LookupResult::single(value))
        })
    }

    fn failing(calls: &Arc<AtomicUsize>, delay: Duration) -> Loader {
        let calls = Arc::clone(calls);
        loader(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            Err(LookupError::Fetch("source down".into()))
        })
    }

    #[tokio::test]
    async fn test_hit_after_load() {
        let cache = LoadingCache::new("test", CachePolicy::retaining());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = LookupKey::new("k1");

        let first = cache.get(&key, counting(&calls, "v1", Duration::ZERO)).await.unwrap();
        let second = cache.get(&key, counting(&calls, "other", Duration::ZERO)).await.unwrap();

        assert_eq!(first, LookupResult::single("v1"));
        assert_eq!(second, first);
        assert_eq!(cache.get_if_present(&key), Some(LookupResult::single("v1")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_if_present_never_loads() {
        let cache = LoadingCache::new("test", CachePolicy::retaining());
        assert!(cache.get_if_present(&LookupKey::new("cold")).is_none());
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_gets_share_one_load() {
        let cache = Arc::new(LoadingCache::new("test", CachePolicy::retaining()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let cache = Arc::clone(&cache);
            let loader = counting(&calls, "v1", Duration::from_millis(100));
            handles.push(tokio::spawn(async move {
                cache.get(&LookupKey::new("k1"), loader).await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), LookupResult::single("v1"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failure_is_shared_and_not_cached() {
        let cache = Arc::new(LoadingCache::new("test", CachePolicy::retaining()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let loader = failing(&calls, Duration::from_millis(100));
            handles.push(tokio::spawn(async move {
                cache.get(&LookupKey::new("k1"), loader).await
            }));
        }

        for handle in handles {
            assert_eq!(
                handle.await.unwrap(),
                Err(LookupError::Fetch("source down".into()))
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.get_if_present(&LookupKey::new("k1")).is_none());

        cache
            .get(&LookupKey::new("k1"), counting(&calls, "v1", Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_different_keys_load_concurrently() {
        let cache = Arc::new(LoadingCache::new("test", CachePolicy::retaining()));
        // Each loader only finishes once both are running at the same time.
        let barrier = Arc::new(Barrier::new(2));

        let make_loader = |value: &'static str| {
            let barrier = Arc::clone(&barrier);
            loader(async move {
                barrier.wait().await;
                Ok(LookupResult::single(value))
            })
        };

        let (k1, k2) = (LookupKey::new("k1"), LookupKey::new("k2"));
        let both = async {
            tokio::join!(
                cache.get(&k1, make_loader("v1")),
                cache.get(&k2, make_loader("v2")),
            )
        };

        let (r1, r2) = tokio::time::timeout(Duration::from_secs(2), both)
            .await
            .expect("loads for different keys must not block each other");
        assert_eq!(r1.unwrap(), LookupResult::single("v1"));
        assert_eq!(r2.unwrap(), LookupResult::single("v2"));
    }

    #[tokio::test]
    async fn test_purge_all() {
        let cache = LoadingCache::new("test", CachePolicy::retaining());
        let calls = Arc::new(AtomicUsize::new(0));

        for key in ["k1", "k2", "k3"] {
            cache
                .get(&LookupKey::new(key), counting(&calls, key, Duration::ZERO))
                .await
                .unwrap();
        }
        assert_eq!(cache.entry_count(), 3);

        cache.purge();

        for key in ["k1", "k2", "k3"] {
            assert!(cache.get_if_present(&LookupKey::new(key)).is_none());
        }
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_purge_single_key() {
        let cache = LoadingCache::new("test", CachePolicy::retaining());
        let calls = Arc::new(AtomicUsize::new(0));
        let k1 = LookupKey::new("k1");
        let k2 = LookupKey::new("k2");

        cache.get(&k1, counting(&calls, "v1", Duration::ZERO)).await.unwrap();
        cache.get(&k2, counting(&calls, "v2", Duration::ZERO)).await.unwrap();

        cache.purge_key(&k1);

        assert!(cache.get_if_present(&k1).is_none());
        assert_eq!(cache.get_if_present(&k2), Some(LookupResult::single("v2")));
    }

    #[tokio::test]
    async fn test_load_in_flight_during_purge_may_repopulate() {
        let cache = Arc::new(LoadingCache::new("test", CachePolicy::retaining()));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = LookupKey::new("k1");

        let pending = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            let loader = counting(&calls, "v1", Duration::from_millis(50));
            tokio::spawn(async move { cache.get(&key, loader).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        cache.purge();
        pending.await.unwrap().unwrap();

        assert_eq!(cache.get_if_present(&key), Some(LookupResult::single("v1")));
    }

    #[tokio::test]
    async fn test_expire_after_write() {
        let policy = CachePolicy {
            expire_after_write: Some(Duration::from_millis(40)),
            ..CachePolicy::retaining()
        };
        let cache = LoadingCache::new("test", policy);
        let calls = Arc::new(AtomicUsize::new(0));
        let key = LookupKey::new("k1");

        cache.get(&key, counting(&calls, "v1", Duration::ZERO)).await.unwrap();
        assert!(cache.get_if_present(&key).is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get_if_present(&key).is_none());
        cache.get(&key, counting(&calls, "v2", Duration::ZERO)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_result_ttl_is_honoured() {
        let cache = LoadingCache::new("test", CachePolicy::retaining());
        let key = LookupKey::new("k1");

        let short_lived = loader(async {
            Ok(LookupResult::single("v1").with_cache_ttl(Duration::from_millis(30)))
        });
        cache.get(&key, short_lived).await.unwrap();
        assert!(cache.get_if_present(&key).is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get_if_present(&key).is_none());
    }

    #[tokio::test]
    async fn test_least_recently_accessed_is_evicted() {
        let policy = CachePolicy {
            max_entries: Some(2),
            ..CachePolicy::retaining()
        };
        let cache = LoadingCache::new("test", policy);
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get(&"k1".into(), counting(&calls, "v1", Duration::ZERO)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.get(&"k2".into(), counting(&calls, "v2", Duration::ZERO)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.get_if_present(&"k1".into()).is_some());
        tokio::time::sleep(Duration::from_millis(5)).await;

        cache.get(&"k3".into(), counting(&calls, "v3", Duration::ZERO)).await.unwrap();

        assert_eq!(cache.entry_count(), 2);
        assert!(cache.get_if_present(&"k1".into()).is_some());
        assert!(cache.get_if_present(&"k2".into()).is_none());
        assert!(cache.get_if_present(&"k3".into()).is_some());
    }

    #[tokio::test]
    async fn test_load_timeout_is_a_failure() {
        let policy = CachePolicy {
            load_timeout: Some(Duration::from_millis(20)),
            ..CachePolicy::retaining()
        };
        let cache = LoadingCache::new("test", policy);
        let calls = Arc::new(AtomicUsize::new(0));

        let result = cache
            .get(&"slow".into(), counting(&calls, "v1", Duration::from_millis(500)))
            .await;

        assert_eq!(result, Err(LookupError::Timeout(Duration::from_millis(20))));
        assert!(cache.get_if_present(&"slow".into()).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pass_through_coalesces_without_retaining() {
        let cache = Arc::new(LoadingCache::new("test", CachePolicy::pass_through()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let loader = counting(&calls, "v1", Duration::from_millis(200));
            handles.push(tokio::spawn(async move {
                cache.get(&LookupKey::new("k1"), loader).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.get_if_present(&LookupKey::new("k1")).is_none());
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_loader_is_reported_and_recoverable() {
        let cache = LoadingCache::new("test", CachePolicy::retaining());
        let key = LookupKey::new("k1");

        let broken = loader(async { panic!("adapter bug") });
        let result = cache.get(&key, broken).await;
        assert!(matches!(result, Err(LookupError::Aborted(_))));

        let fixed = loader(async { Ok(LookupResult::single("v1")) });
        assert_eq!(cache.get(&key, fixed).await.unwrap(), LookupResult::single("v1"));
    }

    #[tokio::test]
    async fn test_in_flight_load_does_not_count_towards_bound() {
        let policy = CachePolicy {
            max_entries: Some(1),
            ..CachePolicy::retaining()
        };
        let cache = Arc::new(LoadingCache::new("test", policy));
        let calls = Arc::new(AtomicUsize::new(0));

        let slow = {
            let cache = Arc::clone(&cache);
            let loader = counting(&calls, "v2", Duration::from_millis(300));
            tokio::spawn(async move { cache.get(&"k2".into(), loader).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        cache
            .get(&"k1".into(), counting(&calls, "v1", Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(cache.get_if_present(&"k1".into()), Some(LookupResult::single("v1")));
        assert_eq!(cache.entry_count(), 1);

        // Once k2 lands the bound is exceeded and the older k1 goes.
        slow.await.unwrap().unwrap();
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(cache.get_if_present(&"k2".into()), Some(LookupResult::single("v2")));
        assert!(cache.get_if_present(&"k1".into()).is_none());
    }

    #[tokio::test]
    async fn test_full_cache_evicts_with_headroom() {
        let policy = CachePolicy {
            max_entries: Some(16),
            ..CachePolicy::retaining()
        };
        let cache = LoadingCache::new("test", policy);
        let calls = Arc::new(AtomicUsize::new(0));

        for i in 0..16 {
            let key = LookupKey::new(format!("k{i}"));
            cache.get(&key, counting(&calls, "v", Duration::ZERO)).await.unwrap();
        }
        assert_eq!(cache.entry_count(), 16);

        let newest = LookupKey::new("k16");
        cache.get(&newest, counting(&calls, "v", Duration::ZERO)).await.unwrap();

        // One over the bound plus 16 / 8 of headroom.
        assert_eq!(cache.entry_count(), 14);
        assert!(cache.get_if_present(&newest).is_some());
    }

    #[tokio::test]
    async fn test_purge_resets_entry_count() {
        let policy = CachePolicy {
            max_entries: Some(2),
            ..CachePolicy::retaining()
        };
        let cache = LoadingCache::new("test", policy);
        let calls = Arc::new(AtomicUsize::new(0));

        for key in ["k1", "k2"] {
            cache.get(&key.into(), counting(&calls, key, Duration::ZERO)).await.unwrap();
        }
        cache.purge_key(&"k1".into());
        cache.purge_key(&"k1".into());
        assert_eq!(cache.entry_count(), 1);

        cache.purge();
        assert_eq!(cache.entry_count(), 0);

        for key in ["k3", "k4"] {
            cache.get(&key.into(), counting(&calls, key, Duration::ZERO)).await.unwrap();
        }
        assert_eq!(cache.entry_count(), 2);
        assert!(cache.get_if_present(&"k3".into()).is_some());
    }
}
