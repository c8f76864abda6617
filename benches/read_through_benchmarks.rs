//! Read-Through Cache Benchmarks
//!
//! Measures hit throughput across segment counts, the cost of a cold miss,
//! and how well concurrent misses on a hot key coalesce.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dbcache::config::ReadThroughCacheConfig;
use dbcache::source::{self, DataSource};
use dbcache::ReadThroughCache;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const KEY_SPACE: usize = 10_000;
const OPS_PER_THREAD: usize = 1_000;

type Cache<D> = ReadThroughCache<usize, usize, D>;

fn identity_source() -> impl DataSource<usize, usize, Error = ()> + Send + Sync {
    source::from_fn(|key: &usize| Ok::<_, ()>(Some(*key)))
}

fn warm_cache<D: DataSource<usize, usize>>(cache: &Cache<D>) {
    for i in 0..KEY_SPACE {
        let _ = cache.get(&i);
    }
}

fn run_concurrent_reads<D>(cache: Arc<Cache<D>>, num_threads: usize, ops_per_thread: usize)
where
    D: DataSource<usize, usize> + Send + Sync + 'static,
    D::Error: Send + Sync,
{
    let mut handles = Vec::with_capacity(num_threads);
    for t in 0..num_threads {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..ops_per_thread {
                let key = (t * ops_per_thread + i) % KEY_SPACE;
                let _ = black_box(cache.get(&key));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

/// Benchmark warm-cache reads from multiple threads
fn concurrent_hits(c: &mut Criterion) {
    let mut group = c.benchmark_group("Concurrent Hits");
    group.throughput(Throughput::Elements((8 * OPS_PER_THREAD) as u64));

    let cache = Arc::new(Cache::new(identity_source()));
    warm_cache(&cache);

    group.bench_function("8 threads", |b| {
        b.iter(|| run_concurrent_reads(Arc::clone(&cache), 8, OPS_PER_THREAD));
    });

    group.finish();
}

/// Benchmark single-threaded hit and miss paths
fn single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("Single Thread");

    let cache = Cache::new(identity_source());
    warm_cache(&cache);
    group.bench_function("hit", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % KEY_SPACE;
            black_box(cache.get(&i))
        });
    });

    group.bench_function("miss", |b| {
        b.iter_batched(
            || Cache::new(identity_source()),
            |cache| black_box(cache.get(&42)),
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark many threads missing on one slow key at once
fn hot_key_coalescing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Hot Key Coalescing");
    group.sample_size(20);

    for threads in [2, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let calls = Arc::new(AtomicUsize::new(0));
                let counter = Arc::clone(&calls);
                let cache = Arc::new(Cache::new(source::from_fn(move |key: &usize| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    thread::sleep(Duration::from_millis(1));
                    Ok::<_, ()>(Some(*key))
                })));

                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let cache = Arc::clone(&cache);
                        thread::spawn(move || black_box(cache.get(&7)).is_ok())
                    })
                    .collect();
                for handle in handles {
                    assert!(handle.join().unwrap());
                }
                assert_eq!(calls.load(Ordering::Relaxed), 1);
            });
        });
    }

    group.finish();
}

/// Benchmark different segment counts under concurrent hits
fn segment_count_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("Segment Count");
    group.throughput(Throughput::Elements((8 * OPS_PER_THREAD) as u64));

    for segments in [1, 4, 16, 64] {
        let cache = Arc::new(ReadThroughCache::init(
            ReadThroughCacheConfig::new().with_segments(segments),
            identity_source(),
            None,
        ));
        warm_cache(&cache);

        group.bench_with_input(BenchmarkId::from_parameter(segments), &segments, |b, _| {
            b.iter(|| run_concurrent_reads(Arc::clone(&cache), 8, OPS_PER_THREAD));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    concurrent_hits,
    single_thread,
    hot_key_coalescing,
    segment_count_comparison
);
criterion_main!(benches);
