//! Per-shard operation counters.
//!
//! Counters are plain relaxed atomics: they are observational and never feed
//! back into eviction or expiry decisions. [`ShardedStore::metrics`]
//! sums the per-shard snapshots.
//!
//! [`ShardedStore::metrics`]: crate::store::ShardedStore::metrics

use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of store-level metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub removes: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl StoreMetrics {
    /// Fraction of lookups that hit, or `0.0` before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl Add for StoreMetrics {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            hits: self.hits + rhs.hits,
            misses: self.misses + rhs.misses,
            inserts: self.inserts + rhs.inserts,
            updates: self.updates + rhs.updates,
            removes: self.removes + rhs.removes,
            evictions: self.evictions + rhs.evictions,
            expirations: self.expirations + rhs.expirations,
        }
    }
}

/// Atomic counters owned by one shard.
#[derive(Debug, Default)]
pub(crate) struct ShardCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    removes: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl ShardCounters {
    /// Snapshot current counters.
    pub(crate) fn snapshot(&self) -> StoreMetrics {
        StoreMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn inc_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_snapshot_and_sum() {
        let a = ShardCounters::default();
        a.inc_hit();
        a.inc_hit();
        a.inc_miss();
        a.inc_eviction();

        let b = ShardCounters::default();
        b.inc_insert();
        b.inc_expiration();
        b.inc_remove();
        b.inc_update();

        let total = a.snapshot() + b.snapshot();
        assert_eq!(
            total,
            StoreMetrics {
                hits: 2,
                misses: 1,
                inserts: 1,
                updates: 1,
                removes: 1,
                evictions: 1,
                expirations: 1,
            }
        );
    }

    #[test]
    fn hit_ratio_handles_empty() {
        assert_eq!(StoreMetrics::default().hit_ratio(), 0.0);
        let m = StoreMetrics {
            hits: 3,
            misses: 1,
            ..StoreMetrics::default()
        };
        assert!((m.hit_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
