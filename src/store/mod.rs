//! Sharded storage: bounded LRU partitions with TTL expiry.
//!
//! ## Key Components
//! - [`Shard`]: one partition (entry map + recency heap + upgradable lock).
//! - [`ShardedStore`]: routes keys to shards by FNV-1a hash.
//! - [`StoreMetrics`]: counter snapshot, per shard or summed.

pub mod counters;
pub mod shard;
pub mod sharded;

pub use counters::StoreMetrics;
pub use shard::{EvictionCallback, Shard};
pub use sharded::{DEFAULT_SHARD_COUNT, DEFAULT_SIZE_PER_SHARD, ShardedStore};
