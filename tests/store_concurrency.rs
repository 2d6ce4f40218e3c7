// ==============================================
// SHARDED STORE CONCURRENCY TESTS (integration)
// ==============================================
//
// Capacity bounds, get-or-create atomicity and lock exclusion under real
// thread interleavings.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use shardcache::ShardedStore;
use shardcache::sync::UpgradableRwLock;

// ==============================================
// Get-or-create Atomicity
// ==============================================

mod get_or_create {
    use super::*;

    #[test]
    fn exactly_one_creator_per_key() {
        const THREADS: usize = 8;

        for _ in 0..200 {
            let store: Arc<ShardedStore<u64, usize>> =
                Arc::new(ShardedStore::new(64, 4, Duration::from_secs(60)));
            let barrier = Arc::new(Barrier::new(THREADS));

            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let store = store.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        store.get_or_create(42, t)
                    })
                })
                .collect();

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let creators = results.iter().filter(|(_, existed)| !existed).count();
            assert_eq!(creators, 1);

            let winners: HashSet<usize> = results.iter().map(|(v, _)| *v).collect();
            assert_eq!(winners.len(), 1, "all callers must see the winner's value");
        }
    }

    #[test]
    fn capacity_holds_under_concurrent_inserts() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 2_000;

        let store: Arc<ShardedStore<u64, u64>> =
            Arc::new(ShardedStore::new(32, 4, Duration::from_secs(60)));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        let key = t * PER_THREAD + i;
                        store.get_or_create(key, key);
                        let _ = store.get(&(key / 2));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for shard in store.shards() {
            assert!(shard.len() <= 32);
        }
        store.check_invariants().unwrap();

        let metrics = store.metrics();
        assert_eq!(metrics.inserts, THREADS * PER_THREAD);
        assert_eq!(metrics.inserts - metrics.evictions, store.len() as u64);
    }
}

// ==============================================
// Lock Exclusion
// ==============================================

mod lock {
    use super::*;

    #[test]
    fn writers_are_exclusive() {
        let lock = Arc::new(UpgradableRwLock::new(0u64));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        *lock.write() += 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*lock.read(), 8_000);
    }

    #[test]
    fn upgrades_are_serialized() {
        let lock = Arc::new(UpgradableRwLock::new(Vec::<usize>::new()));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let lock = lock.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        let value = t * 1_000 + i;
                        let mut check = lock.upgradable_read();
                        if !check.contains(&value) {
                            check.upgrade().push(value);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let values = lock.read();
        assert_eq!(values.len(), 1_600);
        assert_eq!(values.iter().collect::<HashSet<_>>().len(), 1_600);
    }

    #[test]
    fn readers_never_observe_partial_writes() {
        let lock = Arc::new(UpgradableRwLock::new((0u64, 0u64)));
        let stop = Arc::new(AtomicBool::new(false));
        let reads = Arc::new(AtomicUsize::new(0));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let lock = lock.clone();
                let stop = stop.clone();
                let reads = reads.clone();
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        let pair = lock.read();
                        assert_eq!(pair.0, pair.1);
                        reads.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        for _ in 0..2_000 {
            let mut check = lock.upgradable_read();
            let mut write = check.upgrade();
            write.0 += 1;
            write.1 += 1;
        }
        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(*lock.read(), (2_000, 2_000));
    }
}
