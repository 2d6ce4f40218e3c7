//! Cache configuration and builder.
//!
//! [`CacheConfig`] is the plain data record (deserializable with the `serde`
//! feature); [`CacheBuilder`] wraps it with fluent setters, a clock choice,
//! and validating constructors for both the raw [`ShardedStore`] and the
//! deduplicating [`Cache`] facade.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use shardcache::builder::{CacheBuilder, FailurePolicy};
//!
//! let cache = CacheBuilder::new()
//!     .size_per_shard(128)
//!     .shard_count(8)
//!     .ttl(Duration::from_secs(30))
//!     .failure_policy(FailurePolicy::Evict)
//!     .build(|id: &u64| Ok::<_, String>(id.to_string()));
//!
//! let value = cache.get(&7, |id| Ok(id * 2)).unwrap();
//! assert_eq!(value, 14);
//! ```

use std::hash::Hash;
use std::time::Duration;

use crate::cache::Cache;
use crate::error::ConfigError;
use crate::store::{DEFAULT_SHARD_COUNT, DEFAULT_SIZE_PER_SHARD, ShardedStore};
use crate::time::{Clock, SystemClock};

/// Time-to-live used by [`CacheConfig::default`].
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

pub(crate) const TTL_REASON: &str = "must be > 0";

/// What the facade does with a slot whose getter failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "snake_case")
)]
pub enum FailurePolicy {
    /// Keep the rejected result until it expires or is evicted; later
    /// callers receive the same error without re-running the getter.
    #[default]
    Cache,
    /// Drop the rejected result once its waiters are released, so the next
    /// call retries the getter.
    Evict,
}

/// Cache sizing and behaviour parameters.
///
/// A `size_per_shard` or `shard_count` of 0 selects the library default
/// (64 and 16 respectively).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct CacheConfig {
    /// Maximum entries held by each shard.
    pub size_per_shard: usize,
    /// Number of independently locked shards.
    pub shard_count: usize,
    /// Age after which an entry is treated as absent.
    pub ttl: Duration,
    /// Handling of failed getter results.
    pub failure_policy: FailurePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size_per_shard: DEFAULT_SIZE_PER_SHARD,
            shard_count: DEFAULT_SHARD_COUNT,
            ttl: DEFAULT_TTL,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `ttl` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::new("ttl", TTL_REASON));
        }
        Ok(())
    }
}

/// Fluent builder for caches and stores.
#[derive(Debug, Clone)]
pub struct CacheBuilder<C = SystemClock> {
    config: CacheConfig,
    clock: C,
}

impl CacheBuilder<SystemClock> {
    /// Starts from [`CacheConfig::default`] on the system clock.
    pub fn new() -> Self {
        Self::from_config(CacheConfig::default())
    }

    /// Starts from an existing configuration on the system clock.
    pub fn from_config(config: CacheConfig) -> Self {
        Self {
            config,
            clock: SystemClock,
        }
    }
}

impl Default for CacheBuilder<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CacheBuilder<C>
where
    C: Clock + Clone,
{
    /// Sets the maximum entries per shard (0 selects the default).
    pub fn size_per_shard(mut self, size: usize) -> Self {
        self.config.size_per_shard = size;
        self
    }

    /// Sets the number of shards (0 selects the default).
    pub fn shard_count(mut self, count: usize) -> Self {
        self.config.shard_count = count;
        self
    }

    /// Sets the entry time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Sets the failed-getter policy.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Replaces the time source.
    pub fn clock<C2>(self, clock: C2) -> CacheBuilder<C2>
    where
        C2: Clock + Clone,
    {
        CacheBuilder {
            config: self.config,
            clock,
        }
    }

    /// Returns the configuration built so far.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Builds the deduplicating cache facade.
    ///
    /// # Panics
    ///
    /// Panics on invalid configuration. For a non-panicking alternative, use
    /// [`try_build`](Self::try_build).
    pub fn build<K, V, E, F>(self, key_fn: F) -> Cache<K, V, E, F, C>
    where
        F: Fn(&K) -> Result<String, E>,
    {
        match self.try_build(key_fn) {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Builds the deduplicating cache facade, returning an error on invalid
    /// configuration instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn try_build<K, V, E, F>(self, key_fn: F) -> Result<Cache<K, V, E, F, C>, ConfigError>
    where
        F: Fn(&K) -> Result<String, E>,
    {
        self.config.validate()?;
        let store = self.make_store();
        Ok(Cache::from_parts(store, self.config.failure_policy, key_fn))
    }

    /// Builds a bare sharded store (no deduplication).
    ///
    /// # Panics
    ///
    /// Panics on invalid configuration.
    pub fn build_store<K, V>(self) -> ShardedStore<K, V, C>
    where
        K: Eq + Hash + Clone,
    {
        match self.try_build_store() {
            Ok(store) => store,
            Err(e) => panic!("{}", e),
        }
    }

    /// Builds a bare sharded store, returning an error on invalid
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn try_build_store<K, V>(self) -> Result<ShardedStore<K, V, C>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        self.config.validate()?;
        Ok(self.make_store())
    }

    fn make_store<K, V>(&self) -> ShardedStore<K, V, C>
    where
        K: Eq + Hash + Clone,
    {
        ShardedStore::with_clock(
            self.config.size_per_shard,
            self.config.shard_count,
            self.config.ttl,
            self.clock.clone(),
        )
    }
}
