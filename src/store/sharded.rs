//! Hash-partitioned collection of [`Shard`]s.
//!
//! [`ShardedStore`] routes every key to exactly one shard with a
//! [`ShardSelector`] and delegates to it. Shards never coordinate: there is
//! no cross-shard lock, so operations on different shards are fully
//! independent and LRU order holds only within a shard.
//!
//! ## Example Usage
//!
//! ```
//! use std::time::Duration;
//!
//! use shardcache::store::ShardedStore;
//!
//! let store: ShardedStore<String, u64> = ShardedStore::new(64, 4, Duration::from_secs(60));
//!
//! let (value, existed) = store.get_or_create("answer".to_string(), 42);
//! assert_eq!((value, existed), (42, false));
//! assert!(store.contains(&"answer".to_string()));
//! assert_eq!(store.len(), 1);
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::ds::ShardSelector;
use crate::error::InvariantError;
use crate::store::counters::StoreMetrics;
use crate::store::shard::{EvictionCallback, Shard};
use crate::time::{Clock, SystemClock};

/// Entries per shard used when `0` is requested.
pub const DEFAULT_SIZE_PER_SHARD: usize = 64;

/// Shard count used when `0` is requested.
pub const DEFAULT_SHARD_COUNT: usize = 16;

/// Thread-safe store partitioned into independently locked shards.
pub struct ShardedStore<K, V, C = SystemClock> {
    selector: ShardSelector,
    size_per_shard: usize,
    ttl: Duration,
    shards: Box<[Shard<K, V, C>]>,
}

impl<K, V> ShardedStore<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
{
    /// Creates a store on the system clock.
    ///
    /// A `size_per_shard` of 0 selects [`DEFAULT_SIZE_PER_SHARD`]; a
    /// `shard_count` of 0 selects [`DEFAULT_SHARD_COUNT`].
    ///
    /// # Panics
    ///
    /// Panics if `ttl` is zero. [`CacheBuilder::try_build_store`] reports the
    /// same condition as a [`ConfigError`](crate::error::ConfigError).
    ///
    /// [`CacheBuilder::try_build_store`]: crate::builder::CacheBuilder::try_build_store
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use shardcache::store::ShardedStore;
    ///
    /// let store: ShardedStore<u64, u64> = ShardedStore::new(0, 0, Duration::from_secs(1));
    /// assert_eq!(store.size_per_shard(), 64);
    /// assert_eq!(store.shard_count(), 16);
    /// ```
    pub fn new(size_per_shard: usize, shard_count: usize, ttl: Duration) -> Self {
        Self::with_clock(size_per_shard, shard_count, ttl, SystemClock)
    }
}

impl<K, V, C> ShardedStore<K, V, C>
where
    K: Eq + Hash + Clone,
    C: Clock + Clone,
{
    /// Creates a store whose shards all read time from `clock`.
    ///
    /// # Panics
    ///
    /// Panics if `ttl` is zero.
    pub fn with_clock(size_per_shard: usize, shard_count: usize, ttl: Duration, clock: C) -> Self {
        let size_per_shard = if size_per_shard == 0 {
            DEFAULT_SIZE_PER_SHARD
        } else {
            size_per_shard
        };
        let shard_count = if shard_count == 0 {
            DEFAULT_SHARD_COUNT
        } else {
            shard_count
        };
        let shards = (0..shard_count)
            .map(|id| Shard::with_clock(id, size_per_shard, ttl, clock.clone()))
            .collect();
        debug!(size_per_shard, shard_count, ?ttl, "created sharded store");
        Self {
            selector: ShardSelector::new(shard_count),
            size_per_shard,
            ttl,
            shards,
        }
    }
}

impl<K, V, C> ShardedStore<K, V, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Returns the capacity of each shard.
    pub fn size_per_shard(&self) -> usize {
        self.size_per_shard
    }

    /// Returns the total capacity across all shards.
    pub fn capacity(&self) -> usize {
        self.size_per_shard * self.shards.len()
    }

    /// Returns the entry time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the index of the shard owning `key`.
    pub fn shard_index(&self, key: &K) -> usize {
        self.selector.shard_for_key(key)
    }

    /// Returns the shard owning `key`.
    pub fn shard_for(&self, key: &K) -> &Shard<K, V, C> {
        &self.shards[self.shard_index(key)]
    }

    /// Iterates over all shards in index order.
    pub fn shards(&self) -> impl Iterator<Item = &Shard<K, V, C>> {
        self.shards.iter()
    }

    /// See [`Shard::get_or_create`].
    pub fn get_or_create(&self, key: K, candidate: V) -> (V, bool)
    where
        V: Clone,
    {
        self.shard_for(&key).get_or_create(key, candidate)
    }

    /// See [`Shard::get`].
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.shard_for(key).get(key)
    }

    /// See [`Shard::put`].
    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.shard_for(&key).put(key, value)
    }

    /// See [`Shard::contains`].
    pub fn contains(&self, key: &K) -> bool {
        self.shard_for(key).contains(key)
    }

    /// See [`Shard::remove`].
    pub fn remove(&self, key: &K) -> Option<V> {
        self.shard_for(key).remove(key)
    }

    /// See [`Shard::remove_if`].
    pub fn remove_if(&self, key: &K, predicate: impl FnOnce(&V) -> bool) -> Option<V> {
        self.shard_for(key).remove_if(key, predicate)
    }

    /// Returns the number of entries in the shard owning `key`.
    pub fn shard_len(&self, key: &K) -> usize {
        self.shard_for(key).len()
    }

    /// Returns the number of stored entries across all shards.
    ///
    /// Shards are visited one at a time, so the total is not a consistent
    /// snapshot under concurrent writes.
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    /// Returns `true` if every shard is empty.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(Shard::is_empty)
    }

    /// Purges expired entries from every shard.
    pub fn purge_expired(&self) -> usize {
        self.shards.iter().map(Shard::purge_expired).sum()
    }

    /// Drops every entry in every shard.
    pub fn clear(&self) -> usize {
        self.shards.iter().map(Shard::clear).sum()
    }

    /// Installs a capacity-eviction hook on every shard.
    ///
    /// The hook runs on the evicting thread while that shard is
    /// write-locked; it must not call back into this store for a key on the
    /// same shard.
    pub fn set_eviction_callback<F>(&self, callback: F)
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        let callback: EvictionCallback<K, V> = Arc::new(callback);
        for shard in self.shards.iter() {
            shard.set_eviction_callback(Some(callback.clone()));
        }
    }

    /// Removes the eviction hook from every shard.
    pub fn clear_eviction_callback(&self) {
        for shard in self.shards.iter() {
            shard.set_eviction_callback(None);
        }
    }

    /// Returns counters summed across shards.
    pub fn metrics(&self) -> StoreMetrics {
        self.shards
            .iter()
            .map(Shard::metrics)
            .fold(StoreMetrics::default(), |acc, m| acc + m)
    }

    /// Checks every shard's invariants.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.shards.iter().try_for_each(Shard::check_invariants)
    }
}

impl<K, V, C> fmt::Debug for ShardedStore<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedStore")
            .field("shard_count", &self.shards.len())
            .field("size_per_shard", &self.size_per_shard)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rand::distributions::Alphanumeric;
    use rand::{Rng, thread_rng};

    use super::*;
    use crate::time::ManualClock;

    fn rand_string(len: usize) -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    #[test]
    fn defaults_apply_for_zero() {
        let store: ShardedStore<String, u32> = ShardedStore::new(0, 0, Duration::from_secs(1));
        assert_eq!(store.shard_count(), DEFAULT_SHARD_COUNT);
        assert_eq!(store.size_per_shard(), DEFAULT_SIZE_PER_SHARD);
        assert_eq!(store.capacity(), 64 * 16);
    }

    #[test]
    #[should_panic(expected = "invalid ttl")]
    fn zero_ttl_panics() {
        let _: ShardedStore<String, u32> = ShardedStore::new(16, 4, Duration::ZERO);
    }

    #[test]
    fn round_trip_and_hit() {
        let store: ShardedStore<String, u32> = ShardedStore::new(16, 4, Duration::from_secs(3600));
        assert_eq!(store.get_or_create("A".into(), 6), (6, false));
        assert!(store.contains(&"A".to_string()));
        assert_eq!(store.get_or_create("A".into(), 7), (6, true));
        assert_eq!(store.get(&"A".to_string()), Some(6));
    }

    #[test]
    fn shard_routing_is_stable() {
        let store: ShardedStore<String, u32> = ShardedStore::new(16, 8, Duration::from_secs(60));
        let key = "stable".to_string();
        let idx = store.shard_index(&key);
        for _ in 0..10 {
            assert_eq!(store.shard_index(&key), idx);
        }
        store.put(key.clone(), 1);
        assert_eq!(store.shard_len(&key), 1);
        assert_eq!(store.shard_for(&key).id(), idx);
    }

    #[test]
    fn random_keys_never_exceed_shard_capacity() {
        let store: ShardedStore<String, u32> = ShardedStore::new(16, 4, Duration::from_secs(3600));
        for _ in 0..10_000 {
            let key = rand_string(16);
            let (_, existed) = store.get_or_create(key.clone(), 0);
            assert!(!existed);
            assert!(store.shard_len(&key) <= 16);
        }
        assert!(store.len() <= store.capacity());
        store.check_invariants().unwrap();
    }

    #[test]
    fn ttl_expiry_across_store() {
        let clock = ManualClock::new();
        let store: ShardedStore<String, u32, _> =
            ShardedStore::with_clock(16, 4, Duration::from_micros(1), clock.clone());
        assert!(!store.get_or_create("A".into(), 1).1);
        clock.advance(Duration::from_millis(1));
        assert!(!store.get_or_create("A".into(), 1).1);
        assert_eq!(store.metrics().expirations, 1);
    }

    #[test]
    fn callback_installed_on_all_shards() {
        let clock = ManualClock::new();
        let store: ShardedStore<u32, u32, _> =
            ShardedStore::with_clock(1, 4, Duration::from_secs(60), clock.clone());
        let evictions = Arc::new(AtomicUsize::new(0));
        {
            let evictions = evictions.clone();
            store.set_eviction_callback(move |_, _| {
                evictions.fetch_add(1, Ordering::SeqCst);
            });
        }
        for key in 0..100u32 {
            clock.advance(Duration::from_millis(1));
            store.put(key, key);
        }
        assert_eq!(store.len(), 4);
        assert_eq!(evictions.load(Ordering::SeqCst), 96);
        assert_eq!(store.metrics().evictions, 96);

        store.clear_eviction_callback();
        store.put(1000, 0);
        assert_eq!(evictions.load(Ordering::SeqCst), 96);
    }

    #[test]
    fn clear_and_purge() {
        let clock = ManualClock::new();
        let store: ShardedStore<u32, u32, _> =
            ShardedStore::with_clock(16, 2, Duration::from_secs(5), clock.clone());
        for key in 0..10u32 {
            store.put(key, key);
        }
        clock.advance(Duration::from_secs(5));
        assert_eq!(store.purge_expired(), 10);
        assert!(store.is_empty());

        store.put(1, 1);
        assert_eq!(store.clear(), 1);
        assert!(store.is_empty());
    }
}
