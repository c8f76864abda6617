//! Cache Metrics System
//!
//! Counters describing how a read-through cache is being used, reported as a
//! `BTreeMap` so the output order is deterministic across runs.
//!
//! Counters are plain atomics updated with `Relaxed` ordering. They are not
//! part of the cache's synchronization and a snapshot taken while other
//! threads are calling `get` may be slightly inconsistent (for example,
//! `fetches` momentarily ahead of `cache_misses`).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by a [`ReadThroughCache`](crate::ReadThroughCache).
#[derive(Debug, Default)]
pub struct ReadThroughMetrics {
    /// Total number of `get` calls
    requests: AtomicU64,

    /// Requests answered from a resolved entry with a value
    cache_hits: AtomicU64,

    /// Requests answered from a resolved entry recording absence
    absent_hits: AtomicU64,

    /// Requests that found nothing cached and became the fetch owner
    cache_misses: AtomicU64,

    /// Requests that joined a fetch already in flight
    coalesced: AtomicU64,

    /// Calls made to the data source
    fetches: AtomicU64,

    /// Fetches that ended in a data source error
    source_errors: AtomicU64,

    /// Fetches whose owner unwound before publishing an outcome
    abandoned: AtomicU64,
}

impl ReadThroughMetrics {
    /// Creates a zeroed set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self, present: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if present {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.absent_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_miss(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_coalesced(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_source_error(&self) {
        self.source_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Total number of `get` calls, including retries after an abandoned fetch.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Requests served from a cached value.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Requests served from a cached absence.
    pub fn absent_hits(&self) -> u64 {
        self.absent_hits.load(Ordering::Relaxed)
    }

    /// Requests that started a fetch.
    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Requests that waited on another caller's fetch.
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    /// Calls made to the data source.
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Fetches that failed with a data source error.
    pub fn source_errors(&self) -> u64 {
        self.source_errors.load(Ordering::Relaxed)
    }

    /// Fetches abandoned by a panicking owner.
    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    /// Fraction of requests answered without contacting the source or
    /// waiting on a fetch, between 0.0 and 1.0.
    pub fn hit_rate(&self) -> f64 {
        let requests = self.requests();
        if requests > 0 {
            (self.cache_hits() + self.absent_hits()) as f64 / requests as f64
        } else {
            0.0
        }
    }

    /// Fraction of requests that started a fetch, between 0.0 and 1.0.
    pub fn miss_rate(&self) -> f64 {
        let requests = self.requests();
        if requests > 0 {
            self.cache_misses() as f64 / requests as f64
        } else {
            0.0
        }
    }

    /// Converts the counters to a BTreeMap for reporting.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("requests".to_string(), self.requests() as f64);
        metrics.insert("cache_hits".to_string(), self.cache_hits() as f64);
        metrics.insert("absent_hits".to_string(), self.absent_hits() as f64);
        metrics.insert("cache_misses".to_string(), self.cache_misses() as f64);
        metrics.insert("coalesced".to_string(), self.coalesced() as f64);
        metrics.insert("fetches".to_string(), self.fetches() as f64);
        metrics.insert("source_errors".to_string(), self.source_errors() as f64);
        metrics.insert("abandoned".to_string(), self.abandoned() as f64);

        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("miss_rate".to_string(), self.miss_rate());

        metrics
    }
}

/// Trait that caches implement for metrics reporting.
///
/// Provides a uniform interface for retrieving metrics from a cache instance.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Name identifying the cache implementation.
    fn algorithm_name(&self) -> &'static str;
}
