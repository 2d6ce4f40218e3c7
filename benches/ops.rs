//! Micro-operation benchmarks for the store layers.
//!
//! Run with: `cargo bench --bench ops`
//!
//! Measures single-threaded per-operation latency for the recency heap, a
//! single shard, the sharded store and the deduplicating cache facade.

use std::hint::black_box;
use std::time::{Duration, Instant};

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use shardcache::Cache;
use shardcache::ds::RecencyHeap;
use shardcache::store::{Shard, ShardedStore};

const CAPACITY: usize = 4_096;
const OPS: u64 = 100_000;
const TTL: Duration = Duration::from_secs(3600);

// ============================================================================
// Recency Heap
// ============================================================================

fn bench_heap(c: &mut Criterion) {
    let mut group = c.benchmark_group("recency_heap_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("push_pop", |b| {
        b.iter_custom(|iters| {
            let mut heap = RecencyHeap::with_capacity(CAPACITY);
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    heap.push(i, i);
                    if heap.len() >= CAPACITY {
                        black_box(heap.pop());
                    }
                }
            }
            start.elapsed()
        })
    });

    group.bench_function("update", |b| {
        b.iter_custom(|iters| {
            let mut heap = RecencyHeap::with_capacity(CAPACITY);
            for i in 0..CAPACITY as u64 {
                heap.push(i, i);
            }
            let mut tick = CAPACITY as u64;
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    tick += 1;
                    black_box(heap.update(&(i % CAPACITY as u64), tick));
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

// ============================================================================
// Shard
// ============================================================================

fn bench_shard(c: &mut Criterion) {
    let mut group = c.benchmark_group("shard_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("get_or_create_hit", |b| {
        b.iter_custom(|iters| {
            let shard: Shard<u64, u64> = Shard::new(0, CAPACITY, TTL);
            for i in 0..CAPACITY as u64 {
                shard.put(i, i);
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    black_box(shard.get_or_create(i % CAPACITY as u64, 0));
                }
            }
            start.elapsed()
        })
    });

    group.bench_function("get_or_create_evicting", |b| {
        b.iter_custom(|iters| {
            let shard: Shard<u64, u64> = Shard::new(0, CAPACITY, TTL);
            let mut next = 0u64;
            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..OPS {
                    next += 1;
                    black_box(shard.get_or_create(next, next));
                }
            }
            start.elapsed()
        })
    });

    group.bench_function("contains", |b| {
        b.iter_custom(|iters| {
            let shard: Shard<u64, u64> = Shard::new(0, CAPACITY, TTL);
            for i in 0..CAPACITY as u64 {
                shard.put(i, i);
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    black_box(shard.contains(&(i % (2 * CAPACITY as u64))));
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

// ============================================================================
// Sharded Store and Cache Facade
// ============================================================================

fn bench_sharded(c: &mut Criterion) {
    let mut group = c.benchmark_group("sharded_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("store_get_hit", |b| {
        b.iter_custom(|iters| {
            let store: ShardedStore<String, u64> = ShardedStore::new(CAPACITY / 16, 16, TTL);
            let keys: Vec<String> = (0..CAPACITY / 2).map(|i| format!("key-{i}")).collect();
            for (i, key) in keys.iter().enumerate() {
                store.put(key.clone(), i as u64);
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS as usize {
                    black_box(store.get(&keys[i % keys.len()]));
                }
            }
            start.elapsed()
        })
    });

    group.bench_function("cache_get_hit", |b| {
        b.iter_custom(|iters| {
            let cache = Cache::new(CAPACITY / 16, 16, TTL, |id: &u64| Ok::<_, ()>(id.to_string()));
            let hot = (CAPACITY / 2) as u64;
            for i in 0..hot {
                let _ = cache.get(&i, |id| Ok(*id));
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    black_box(cache.get(&(i % hot), |id| Ok(*id)).ok());
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_heap, bench_shard, bench_sharded);
criterion_main!(benches);
