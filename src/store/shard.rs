//! One independently locked partition of a sharded cache.
//!
//! A [`Shard`] owns a bounded map of entries, a [`RecencyHeap`] ordering
//! those entries by last access, and the [`UpgradableRwLock`] that guards
//! both. The map and heap always hold exactly the same keys.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │ Shard { id, capacity, ttl, clock, counters }                             │
//! │                                                                          │
//! │   state: UpgradableRwLock<ShardState>                                    │
//! │   ┌──────────────────────────────────────────────────────────────────┐   │
//! │   │ entries:  FxHashMap<K, Entry<V>>   key -> (value, last_accessed) │   │
//! │   │ recency:  RecencyHeap<K, Instant>  oldest access at the root     │   │
//! │   │ on_evict: Option<EvictionCallback> fired on capacity eviction    │   │
//! │   └──────────────────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## get_or_create Flow
//!
//! ```text
//!   upgradable_read ──► lookup(key)
//!        │
//!        ├─ fresh   ──► upgrade ─► touch (heap update) ─► (existing, true)
//!        ├─ expired ──► upgrade ─► purge ─┐
//!        └─ missing ──► upgrade ──────────┴─► evict root if full
//!                                             insert candidate, push heap
//!                                             ─► (candidate, false)
//! ```
//!
//! Plain readers (`contains`, `len`) keep running during the lookup; the
//! upgrade only waits for them when the shard is actually mutated.
//!
//! ## Expiry
//!
//! An entry is expired once `now >= last_accessed + ttl`. Expiry is lazy:
//! an expired entry is purged by the next write-capable access that touches
//! it ([`get_or_create`](Shard::get_or_create), [`get`](Shard::get),
//! [`put`](Shard::put), [`remove`](Shard::remove)), or by an explicit
//! [`purge_expired`](Shard::purge_expired). Shared-lock readers simply report
//! it as absent.
//!
//! ## Eviction Callback
//!
//! The callback runs synchronously while the shard is write-locked, once per
//! capacity eviction (never for expiry). It must not call back into the same
//! shard.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::ds::RecencyHeap;
use crate::error::InvariantError;
use crate::store::counters::{ShardCounters, StoreMetrics};
use crate::sync::UpgradableRwLock;
use crate::time::{Clock, SystemClock};

/// Hook invoked with each entry evicted for capacity.
pub type EvictionCallback<K, V> = Arc<dyn Fn(K, V) + Send + Sync>;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    last_accessed: Instant,
}

impl<V> Entry<V> {
    #[inline]
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_accessed) >= ttl
    }
}

struct ShardState<K, V> {
    entries: FxHashMap<K, Entry<V>>,
    recency: RecencyHeap<K, Instant>,
    on_evict: Option<EvictionCallback<K, V>>,
}

impl<K, V> ShardState<K, V>
where
    K: Eq + Hash + Clone,
{
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            recency: RecencyHeap::with_capacity(capacity),
            on_evict: None,
        }
    }

    fn touch(&mut self, key: &K, now: Instant) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_accessed = now;
            self.recency.update(key, now);
        }
    }

    fn purge(&mut self, key: &K) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(key);
        Some(entry)
    }
}

enum Lookup<V> {
    Fresh(V),
    Expired,
    Missing,
}

/// A fixed-capacity LRU partition with TTL expiry.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use shardcache::store::Shard;
/// use shardcache::time::ManualClock;
///
/// let clock = ManualClock::new();
/// let tick = || clock.advance(Duration::from_millis(1));
/// let shard = Shard::with_clock(0, 2, Duration::from_secs(60), clock.clone());
///
/// assert_eq!(shard.get_or_create("a", 1), (1, false));
/// assert_eq!(shard.get_or_create("a", 99), (1, true));
///
/// tick();
/// shard.get_or_create("b", 2);
/// tick();
/// shard.get_or_create("a", 0); // touch "a", "b" is now oldest
/// tick();
/// shard.get_or_create("c", 3); // evicts "b"
///
/// assert!(shard.contains(&"a"));
/// assert!(!shard.contains(&"b"));
/// assert_eq!(shard.len(), 2);
/// ```
pub struct Shard<K, V, C = SystemClock> {
    id: usize,
    capacity: usize,
    ttl: Duration,
    clock: C,
    state: UpgradableRwLock<ShardState<K, V>>,
    counters: ShardCounters,
}

impl<K, V> Shard<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
{
    /// Creates a shard on the system clock.
    ///
    /// `capacity` is clamped to at least 1.
    ///
    /// # Panics
    ///
    /// Panics if `ttl` is zero.
    pub fn new(id: usize, capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(id, capacity, ttl, SystemClock)
    }
}

impl<K, V, C> Shard<K, V, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    /// Creates a shard reading time from `clock`.
    ///
    /// # Panics
    ///
    /// Panics if `ttl` is zero: every entry would be expired on insert, so
    /// no lookup could ever hit.
    pub fn with_clock(id: usize, capacity: usize, ttl: Duration, clock: C) -> Self {
        assert!(!ttl.is_zero(), "invalid ttl: must be > 0");
        let capacity = capacity.max(1);
        Self {
            id,
            capacity,
            ttl,
            clock,
            state: UpgradableRwLock::new(ShardState::with_capacity(capacity)),
            counters: ShardCounters::default(),
        }
    }

    /// Returns this shard's index within its store.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the time-to-live applied to every entry.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the existing live value for `key`, or inserts `candidate`.
    ///
    /// The boolean is `true` when the value already existed. A hit refreshes
    /// the entry's access time; a miss may evict the least recently accessed
    /// entry to make room.
    pub fn get_or_create(&self, key: K, candidate: V) -> (V, bool)
    where
        V: Clone,
    {
        let now = self.clock.now();
        let mut guard = self.state.upgradable_read();
        match self.lookup(&guard, &key, now) {
            Lookup::Fresh(value) => {
                guard.upgrade().touch(&key, now);
                self.counters.inc_hit();
                trace!(shard = self.id, "get_or_create hit");
                (value, true)
            },
            lookup => {
                let mut state = guard.upgrade();
                if matches!(lookup, Lookup::Expired) {
                    state.purge(&key);
                    self.counters.inc_expiration();
                    debug!(shard = self.id, "purged expired entry on access");
                }
                self.counters.inc_miss();
                trace!(shard = self.id, "get_or_create miss");
                self.insert_locked(&mut state, key, candidate.clone(), now);
                (candidate, false)
            },
        }
    }

    /// Returns the live value for `key`, refreshing its access time.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let now = self.clock.now();
        let mut guard = self.state.upgradable_read();
        match self.lookup(&guard, key, now) {
            Lookup::Fresh(value) => {
                guard.upgrade().touch(key, now);
                self.counters.inc_hit();
                Some(value)
            },
            Lookup::Expired => {
                guard.upgrade().purge(key);
                self.counters.inc_expiration();
                self.counters.inc_miss();
                debug!(shard = self.id, "purged expired entry on access");
                None
            },
            Lookup::Missing => {
                self.counters.inc_miss();
                None
            },
        }
    }

    /// Inserts or overwrites `key`, returning the previous live value.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let now = self.clock.now();
        let mut state = self.state.write();
        if let Some(entry) = state.entries.get_mut(&key) {
            let expired = entry.is_expired(self.ttl, now);
            let previous = std::mem::replace(&mut entry.value, value);
            state.touch(&key, now);
            self.counters.inc_update();
            return if expired {
                self.counters.inc_expiration();
                None
            } else {
                Some(previous)
            };
        }
        self.insert_locked(&mut state, key, value, now);
        None
    }

    /// Returns `true` if `key` holds a live entry.
    ///
    /// Takes only a shared read lock, so it neither refreshes recency nor
    /// purges an expired entry.
    pub fn contains(&self, key: &K) -> bool {
        let now = self.clock.now();
        let state = self.state.read();
        state
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(self.ttl, now))
    }

    /// Returns the number of stored entries, including expired entries not
    /// yet purged.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns `true` if the shard stores no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes `key`, returning its value if it was live.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.remove_if(key, |_| true)
    }

    /// Removes `key` only if `predicate` accepts its current value.
    ///
    /// Expired entries are purged regardless of the predicate and reported
    /// as `None`.
    pub fn remove_if(&self, key: &K, predicate: impl FnOnce(&V) -> bool) -> Option<V> {
        let now = self.clock.now();
        let mut guard = self.state.upgradable_read();
        let (expired, accepted) = match guard.entries.get(key) {
            Some(entry) if entry.is_expired(self.ttl, now) => (true, false),
            Some(entry) => (false, predicate(&entry.value)),
            None => return None,
        };
        if expired {
            guard.upgrade().purge(key);
            self.counters.inc_expiration();
            return None;
        }
        if !accepted {
            return None;
        }
        let entry = guard.upgrade().purge(key)?;
        self.counters.inc_remove();
        Some(entry.value)
    }

    /// Purges every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.write();
        let mut purged = 0;
        // The heap root is the oldest access, so expired entries sit at the top.
        while let Some((key, &at)) = state.recency.peek() {
            if now.saturating_duration_since(at) < self.ttl {
                break;
            }
            let key = key.clone();
            state.purge(&key);
            purged += 1;
        }
        for _ in 0..purged {
            self.counters.inc_expiration();
        }
        if purged > 0 {
            debug!(shard = self.id, purged, "purged expired entries");
        }
        purged
    }

    /// Drops every entry without invoking the eviction callback.
    pub fn clear(&self) -> usize {
        let mut state = self.state.write();
        let dropped = state.entries.len();
        state.entries.clear();
        state.recency.clear();
        dropped
    }

    /// Installs (or with `None`, removes) the capacity-eviction hook.
    pub fn set_eviction_callback(&self, callback: Option<EvictionCallback<K, V>>) {
        self.state.write().on_evict = callback;
    }

    /// Returns a snapshot of this shard's counters.
    pub fn metrics(&self) -> StoreMetrics {
        self.counters.snapshot()
    }

    /// Verifies that map and heap agree and the capacity bound holds.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let state = self.state.read();
        if state.entries.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "shard {} holds {} entries over capacity {}",
                self.id,
                state.entries.len(),
                self.capacity
            )));
        }
        if state.entries.len() != state.recency.len() {
            return Err(InvariantError::new(format!(
                "shard {} map holds {} entries but heap holds {}",
                self.id,
                state.entries.len(),
                state.recency.len()
            )));
        }
        for (key, entry) in &state.entries {
            match state.recency.priority_of(key) {
                Some(at) if *at == entry.last_accessed => {},
                Some(_) => {
                    return Err(InvariantError::new(format!(
                        "shard {} heap priority disagrees with entry access time",
                        self.id
                    )));
                },
                None => {
                    return Err(InvariantError::new(format!(
                        "shard {} entry missing from recency heap",
                        self.id
                    )));
                },
            }
        }
        state.recency.check_invariants()
    }

    fn lookup(&self, state: &ShardState<K, V>, key: &K, now: Instant) -> Lookup<V>
    where
        V: Clone,
    {
        match state.entries.get(key) {
            Some(entry) if entry.is_expired(self.ttl, now) => Lookup::Expired,
            Some(entry) => Lookup::Fresh(entry.value.clone()),
            None => Lookup::Missing,
        }
    }

    /// Inserts an absent key, evicting the oldest entry first when full.
    fn insert_locked(&self, state: &mut ShardState<K, V>, key: K, value: V, now: Instant) {
        if state.entries.len() >= self.capacity {
            self.evict_oldest(state, now);
        }
        state.recency.push(key.clone(), now);
        state.entries.insert(
            key,
            Entry {
                value,
                last_accessed: now,
            },
        );
        self.counters.inc_insert();
    }

    fn evict_oldest(&self, state: &mut ShardState<K, V>, now: Instant) {
        let Some((key, _)) = state.recency.pop() else {
            return;
        };
        let Some(entry) = state.entries.remove(&key) else {
            return;
        };
        if entry.is_expired(self.ttl, now) {
            self.counters.inc_expiration();
            debug!(shard = self.id, "dropped expired entry to make room");
            return;
        }
        self.counters.inc_eviction();
        debug!(
            shard = self.id,
            capacity = self.capacity,
            "evicted least recently accessed entry"
        );
        if let Some(on_evict) = &state.on_evict {
            on_evict(key, entry.value);
        }
    }
}

impl<K, V, C> fmt::Debug for Shard<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shard")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("metrics", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}
