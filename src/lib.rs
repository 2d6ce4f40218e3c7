//! shardcache: sharded LRU cache with TTL expiry and single-flight miss
//! deduplication.
//!
//! ## Layers
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │ Cache<K, V, E, F>            key fn + single-flight getter   │
//!   ├──────────────────────────────────────────────────────────────┤
//!   │ ShardedStore<String, Promise<V, E>>      FNV-1a routing      │
//!   ├──────────────┬──────────────┬──────────────┬─────────────────┤
//!   │ Shard 0      │ Shard 1      │ ...          │ Shard N-1       │
//!   │ UpgradableRwLock<map + RecencyHeap>                          │
//!   └──────────────┴──────────────┴──────────────┴─────────────────┘
//! ```
//!
//! - [`cache`]: the deduplicating facade most callers want.
//! - [`store`]: the sharded LRU/TTL store, usable on its own.
//! - [`sync`]: [`Promise`](sync::Promise) and
//!   [`UpgradableRwLock`](sync::UpgradableRwLock).
//! - [`ds`]: the recency heap and shard selector.
//! - [`builder`]: configuration and validated construction.
//! - [`time`]: pluggable clock for deterministic TTL tests.
//!
//! The library emits `tracing` events but never installs a subscriber.

pub mod builder;
pub mod cache;
pub mod ds;
pub mod error;
pub mod prelude;
pub mod store;
pub mod sync;
pub mod time;

pub use crate::builder::{CacheBuilder, CacheConfig, FailurePolicy};
pub use crate::cache::Cache;
pub use crate::error::{ConfigError, InvariantError};
pub use crate::store::{ShardedStore, StoreMetrics};
