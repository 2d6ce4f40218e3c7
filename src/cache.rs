//! Deduplicating read-through cache.
//!
//! ## Architecture
//!
//! ```text
//!   caller ──► key_fn(&K) ──► String ──► ShardedStore<String, Promise<V, E>>
//!                 │                              │
//!                 │ Err                          ├── existing promise ──► wait()
//!                 ▼                              │
//!           getter(&K) (uncached)                └── fresh promise
//!                                                      │
//!                                                      ▼
//!                                          getter(&K) on this thread,
//!                                          no shard lock held
//!                                                      │
//!                                            resolve / reject ──► wait()
//! ```
//!
//! The store holds a [`Promise`] per derived key, not the value itself. The
//! first caller to miss installs a pending promise and runs the getter; every
//! concurrent caller for the same key finds that promise and blocks on it, so
//! the getter runs once per miss episode and all callers observe the same
//! value or the same error.
//!
//! If the getter panics the promise is abandoned (blocked waiters panic
//! rather than hang), the slot is dropped so the next call retries, and the
//! panic resumes on the creating caller.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::thread;
//! use std::time::Duration;
//!
//! use shardcache::Cache;
//!
//! let cache = Arc::new(Cache::new(64, 4, Duration::from_secs(60), |id: &u32| {
//!     Ok::<_, String>(format!("user:{id}"))
//! }));
//! let calls = Arc::new(AtomicUsize::new(0));
//!
//! let handles: Vec<_> = (0..8)
//!     .map(|_| {
//!         let cache = Arc::clone(&cache);
//!         let calls = Arc::clone(&calls);
//!         thread::spawn(move || {
//!             cache.get(&7, |id| {
//!                 calls.fetch_add(1, Ordering::SeqCst);
//!                 Ok(format!("profile-{id}"))
//!             })
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     assert_eq!(handle.join().unwrap(), Ok("profile-7".to_string()));
//! }
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use tracing::{debug, warn};

use crate::builder::FailurePolicy;
use crate::store::{ShardedStore, StoreMetrics};
use crate::sync::Promise;
use crate::time::{Clock, SystemClock};

/// Read-through cache that collapses concurrent misses on the same key into
/// a single getter call.
///
/// Keys of type `K` are mapped to `String` slots by the key function `F`;
/// two keys deriving the same string share a slot.
pub struct Cache<K, V, E, F, C = SystemClock> {
    store: ShardedStore<String, Promise<V, E>, C>,
    failure_policy: FailurePolicy,
    key_fn: F,
    _key: PhantomData<fn(&K)>,
}

impl<K, V, E, F> Cache<K, V, E, F, SystemClock>
where
    F: Fn(&K) -> Result<String, E>,
{
    /// Creates a cache on the system clock with [`FailurePolicy::Cache`].
    ///
    /// A `size_per_shard` or `shard_count` of 0 selects the defaults (64 and
    /// 16). Use [`CacheBuilder`](crate::builder::CacheBuilder) for the other
    /// knobs.
    ///
    /// # Panics
    ///
    /// Panics if `ttl` is zero, since every slot would expire on insert and
    /// concurrent misses could no longer share a getter.
    pub fn new(size_per_shard: usize, shard_count: usize, ttl: Duration, key_fn: F) -> Self {
        Self::from_parts(
            ShardedStore::new(size_per_shard, shard_count, ttl),
            FailurePolicy::default(),
            key_fn,
        )
    }
}

impl<K, V, E, F, C> Cache<K, V, E, F, C>
where
    F: Fn(&K) -> Result<String, E>,
    C: Clock,
{
    pub(crate) fn from_parts(
        store: ShardedStore<String, Promise<V, E>, C>,
        failure_policy: FailurePolicy,
        key_fn: F,
    ) -> Self {
        Self {
            store,
            failure_policy,
            key_fn,
            _key: PhantomData,
        }
    }

    /// Returns the cached outcome for `key`, computing it with `getter` on a
    /// miss.
    ///
    /// Concurrent callers missing on the same derived key wait for the first
    /// caller's getter instead of running their own. If the key function
    /// fails, `getter` is called directly and nothing is cached.
    ///
    /// Deduplication lasts only while the slot is live. A getter that runs
    /// longer than the TTL leaves a pending slot that the next caller treats
    /// as expired, so that caller starts a second getter for the same key.
    /// Each caller then receives the outcome of the getter it waited on.
    ///
    /// # Panics
    ///
    /// Resumes the getter's panic on the calling thread. Callers blocked on a
    /// getter that panicked on another thread panic as well.
    pub fn get<G>(&self, key: &K, getter: G) -> Result<V, E>
    where
        G: FnOnce(&K) -> Result<V, E>,
        V: Clone,
        E: Clone,
    {
        let slot = match (self.key_fn)(key) {
            Ok(slot) => slot,
            Err(_) => {
                debug!("key function failed; calling getter uncached");
                return getter(key);
            },
        };

        let (promise, existed) = self.store.get_or_create(slot.clone(), Promise::new());
        if existed {
            return promise.wait();
        }

        let abandon = scopeguard::guard_on_unwind((), |()| {
            promise.abandon();
            self.store.remove_if(&slot, |current| current.ptr_eq(&promise));
            warn!(key = %slot, "getter panicked; promise abandoned");
        });
        let outcome = getter(key);
        scopeguard::ScopeGuard::into_inner(abandon);

        match outcome {
            Ok(value) => {
                promise.resolve(value);
            },
            Err(error) => {
                promise.reject(error);
                if self.failure_policy == FailurePolicy::Evict {
                    self.store
                        .remove_if(&slot, |current| current.ptr_eq(&promise));
                }
            },
        }
        promise.wait()
    }

    /// Returns the resolved value for `key` without blocking or calling a
    /// getter.
    ///
    /// `Ok(None)` covers absent, expired, pending and rejected slots.
    pub fn get_cached(&self, key: &K) -> Result<Option<V>, E>
    where
        V: Clone,
        E: Clone,
    {
        let slot = (self.key_fn)(key)?;
        Ok(self.store.get(&slot).and_then(|promise| promise.value()))
    }

    /// Returns `true` if an unexpired slot exists for `key`, whether its
    /// promise is pending or settled.
    ///
    /// Does not refresh recency.
    pub fn has_key(&self, key: &K) -> Result<bool, E> {
        let slot = (self.key_fn)(key)?;
        Ok(self.store.contains(&slot))
    }

    /// Drops the slot for `key`. Returns whether a slot was present.
    ///
    /// Callers already blocked on the dropped promise still receive its
    /// outcome.
    pub fn invalidate(&self, key: &K) -> Result<bool, E> {
        let slot = (self.key_fn)(key)?;
        Ok(self.store.remove(&slot).is_some())
    }

    /// Installs a hook called with each capacity-evicted slot that held a
    /// successfully resolved value.
    ///
    /// Pending and rejected slots are evicted silently. The hook runs while
    /// the shard is write-locked and must not call back into this cache for
    /// a key on the same shard.
    pub fn set_eviction_callback<H>(&self, callback: H)
    where
        H: Fn(String, V) + Send + Sync + 'static,
        V: Clone + 'static,
        E: Clone + 'static,
    {
        self.store
            .set_eviction_callback(move |slot, promise: Promise<V, E>| {
                if let Some(value) = promise.value() {
                    callback(slot, value);
                }
            });
    }

    /// Removes the eviction hook.
    pub fn clear_eviction_callback(&self) {
        self.store.clear_eviction_callback();
    }

    /// Drops every slot.
    pub fn clear(&self) -> usize {
        self.store.clear()
    }

    /// Purges expired slots from every shard.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    /// Returns the number of slots across all shards, pending ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no slot is stored.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns store counters summed across shards.
    pub fn metrics(&self) -> StoreMetrics {
        self.store.metrics()
    }

    /// Returns the configured failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Returns the underlying promise store.
    pub fn store(&self) -> &ShardedStore<String, Promise<V, E>, C> {
        &self.store
    }
}

impl<K, V, E, F, C> fmt::Debug for Cache<K, V, E, F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("store", &self.store)
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}
