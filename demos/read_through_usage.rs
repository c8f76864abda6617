//! Read-Through Cache Usage Examples
//!
//! This example walks through coalesced fetches, cached absence, error
//! passthrough and the metrics report.
//!
//! Run with: cargo run --example read_through_usage

use dbcache::config::ReadThroughCacheConfig;
use dbcache::metrics::CacheMetrics;
use dbcache::{source, DataSource, ReadThroughCache};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A slow lookup table standing in for a database.
struct SlowTable {
    rows: HashMap<u32, String>,
    queries: AtomicUsize,
}

impl SlowTable {
    fn new() -> Self {
        let rows = (0..100).map(|id| (id, format!("user-{id}"))).collect();
        Self {
            rows,
            queries: AtomicUsize::new(0),
        }
    }
}

impl DataSource<u32, String> for SlowTable {
    type Error = String;

    fn get(&self, key: &u32) -> Result<Option<String>, Self::Error> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        Ok(self.rows.get(key).cloned())
    }
}

fn main() {
    println!("Read-Through Cache Usage Examples");
    println!("=================================\n");

    coalesced_fetches();
    println!();

    absent_keys();
    println!();

    error_passthrough();
    println!();

    metrics_report();
}

/// Many threads asking for the same key share one query
fn coalesced_fetches() {
    println!("1. Coalesced Fetches");
    println!("   -----------------");

    let table = Arc::new(SlowTable::new());
    let cache = Arc::new(ReadThroughCache::new(Arc::clone(&table)));

    let start = Instant::now();
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(&7))
        })
        .collect();

    for handle in handles {
        let user = handle.join().expect("Thread panicked");
        assert_eq!(user.ok().flatten().as_deref().map(String::as_str), Some("user-7"));
    }

    println!(
        "   16 threads read key 7 in {:?} with {} query",
        start.elapsed(),
        table.queries.load(Ordering::SeqCst)
    );
}

/// A key the source does not know is cached as absent
fn absent_keys() {
    println!("2. Absent Keys");
    println!("   -----------");

    let table = Arc::new(SlowTable::new());
    let cache = ReadThroughCache::new(Arc::clone(&table));

    for _ in 0..3 {
        assert_eq!(cache.get(&1_000), Ok(None));
    }

    println!(
        "   3 lookups of an unknown key made {} query; peek: {:?}",
        table.queries.load(Ordering::SeqCst),
        cache.peek(&1_000)
    );
}

/// Source errors reach the caller and are never cached
fn error_passthrough() {
    println!("3. Error Passthrough");
    println!("   -----------------");

    let attempts = AtomicUsize::new(0);
    let cache = ReadThroughCache::new(source::from_fn(|key: &String| {
        if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
            return Err(format!("connection refused while loading {key}"));
        }
        Ok(Some(key.len()))
    }));

    for _ in 0..3 {
        match cache.get("config") {
            Ok(value) => println!("   ok: {value:?}"),
            Err(e) => println!("   error: {e}"),
        }
    }
    println!("   cached after recovery: {}", cache.contains_key("config"));
}

/// Counters collected while serving a mixed workload
fn metrics_report() {
    println!("4. Metrics");
    println!("   -------");

    let cache = ReadThroughCache::init(
        ReadThroughCacheConfig::new().with_segments(8),
        SlowTable::new(),
        None,
    );

    thread::scope(|s| {
        for t in 0..4u32 {
            let cache = &cache;
            s.spawn(move || {
                for i in 0..50u32 {
                    let _ = cache.get(&((t + i) % 120));
                }
            });
        }
    });

    println!("   {} ({} segments)", cache.algorithm_name(), cache.segment_count());
    for (name, value) in cache.metrics() {
        println!("   {name:<16} {value:.3}");
    }
}
