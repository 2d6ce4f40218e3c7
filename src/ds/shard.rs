//! Deterministic key-to-shard mapping.
//!
//! Provides the shard routing used by
//! [`ShardedStore`](crate::store::ShardedStore): every key is hashed with
//! 32-bit FNV-1a and reduced modulo the shard count. The mapping depends on
//! nothing but the key bytes and the shard count, so a key stays on the same
//! shard for the whole lifetime of a cache (re-sharding is never performed).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shard Selection Flow                            │
//! │                                                                         │
//! │   Input Key ("user:123")                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌───────────────────────────────────────────────────────────────┐     │
//! │   │  ShardSelector { shards: 4 }                                  │     │
//! │   │                                                               │     │
//! │   │  1. Fnv1aHasher::default()     (offset basis 0x811c9dc5)      │     │
//! │   │  2. key.hash(&mut hasher)      (xor byte, * 0x01000193)       │     │
//! │   │  3. hasher.finish32() % 4                                     │     │
//! │   └───────────────────────────────────────────────────────────────┘     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   Shard Index: 0, 1, 2, or 3                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use shardcache::ds::ShardSelector;
//!
//! let selector = ShardSelector::new(4);
//!
//! let shard = selector.shard_for_key(&"user:123");
//! assert!(shard < 4);
//! assert_eq!(selector.shard_for_key(&"user:123"), shard);
//! ```
//!
//! ## Performance
//!
//! - `shard_for_key`: O(len(key)); FNV-1a does one xor and one multiply per
//!   byte.

use std::hash::{Hash, Hasher};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Hashes `bytes` with 32-bit FNV-1a.
///
/// # Example
///
/// ```
/// use shardcache::ds::shard::fnv1a_32;
///
/// assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
/// assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
/// ```
#[inline]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hasher = Fnv1aHasher::default();
    hasher.write(bytes);
    hasher.finish32()
}

/// Streaming 32-bit FNV-1a [`Hasher`].
///
/// Lets any `Hash` key be routed without first rendering it to a string: the
/// bytes the key's `Hash` impl writes are its canonical representation.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1aHasher {
    state: u32,
}

impl Fnv1aHasher {
    /// Returns the 32-bit digest.
    #[inline]
    pub fn finish32(&self) -> u32 {
        self.state
    }
}

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u32::from(byte);
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}

/// Deterministic shard selector.
///
/// Maps any `Hash`able key to a shard index in `[0, shards)`.
///
/// # Example
///
/// ```
/// use shardcache::ds::ShardSelector;
///
/// let selector = ShardSelector::new(8);
///
/// // Raw bytes and `Hash` keys are both supported
/// assert!(selector.shard_for_bytes(b"my_key") < 8);
/// assert!(selector.shard_for_key(&42_u64) < 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSelector {
    shards: usize,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards.
    ///
    /// The shard count is clamped to at least 1.
    ///
    /// # Example
    ///
    /// ```
    /// use shardcache::ds::ShardSelector;
    ///
    /// assert_eq!(ShardSelector::new(16).shard_count(), 16);
    /// assert_eq!(ShardSelector::new(0).shard_count(), 1);
    /// ```
    pub fn new(shards: usize) -> Self {
        Self {
            shards: shards.max(1),
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Maps a key to a shard index in `[0, shards)`.
    pub fn shard_for_key<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = Fnv1aHasher::default();
        key.hash(&mut hasher);
        self.reduce(hasher.finish32())
    }

    /// Maps raw key bytes to a shard index in `[0, shards)`.
    pub fn shard_for_bytes(&self, bytes: &[u8]) -> usize {
        self.reduce(fnv1a_32(bytes))
    }

    #[inline]
    fn reduce(&self, hash: u32) -> usize {
        (hash as usize) % self.shards
    }
}

impl Default for ShardSelector {
    /// Creates a single-shard selector.
    fn default() -> Self {
        Self::new(1)
    }
}
