//! Multi-threaded throughput benchmarks.
//!
//! Run with: `cargo bench --bench contention`
//!
//! Compares shard counts under a mixed hit/miss workload and measures the
//! cost of collapsing concurrent misses onto one getter.

use std::hint::black_box;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};
use shardcache::{Cache, ShardedStore};

const THREADS: usize = 8;
const OPS_PER_THREAD: u64 = 20_000;
const KEY_SPACE: u64 = 8_192;
const TTL: Duration = Duration::from_secs(3600);

fn run_threads<F>(iters: u64, work: F) -> Duration
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let mut total = Duration::ZERO;
    for _ in 0..iters {
        let barrier = Arc::new(Barrier::new(THREADS + 1));
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let work = work.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    work(t);
                })
            })
            .collect();
        let start = Instant::now();
        barrier.wait();
        for handle in handles {
            let _ = handle.join();
        }
        total += start.elapsed();
    }
    total
}

fn bench_shard_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_mixed");
    group.throughput(Throughput::Elements(THREADS as u64 * OPS_PER_THREAD));

    for shards in [1usize, 4, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(shards), &shards, |b, &shards| {
            b.iter_custom(|iters| {
                let store: Arc<ShardedStore<u64, u64>> = Arc::new(ShardedStore::new(
                    (KEY_SPACE as usize / 2) / shards,
                    shards,
                    TTL,
                ));
                run_threads(iters, move |t| {
                    let mut rng = StdRng::seed_from_u64(t as u64);
                    for _ in 0..OPS_PER_THREAD {
                        let key = rng.gen_range(0..KEY_SPACE);
                        black_box(store.get_or_create(key, key));
                    }
                })
            })
        });
    }

    group.finish();
}

fn bench_single_flight(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_flight");
    group.throughput(Throughput::Elements(THREADS as u64 * OPS_PER_THREAD));

    group.bench_function("hot_keys", |b| {
        b.iter_custom(|iters| {
            let cache = Arc::new(Cache::new(256, 16, TTL, |id: &u64| Ok::<_, ()>(id.to_string())));
            run_threads(iters, move |t| {
                let mut rng = StdRng::seed_from_u64(t as u64);
                for _ in 0..OPS_PER_THREAD {
                    let key = rng.gen_range(0..64u64);
                    black_box(cache.get(&key, |id| Ok(id * 2)).ok());
                }
            })
        })
    });

    group.finish();
}

criterion_group!(benches, bench_shard_counts, bench_single_flight);
criterion_main!(benches);
