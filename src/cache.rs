//! Read-Through Cache Implementation
//!
//! A thread-safe cache in front of a [`DataSource`]. On a miss the cache calls
//! the source, remembers the answer, and hands it to every caller that asked
//! for the same key in the meantime.
//!
//! # How It Works
//!
//! Keys are partitioned across segments, each a `HashMap` behind its own
//! `parking_lot::Mutex`. The map holds a `Slot` per key: either a resolved
//! answer or a Pending marker carrying a single-use `Gate`.
//!
//! ```text
//!  get(k) ─▶ lock segment ─┬─ Resolved ─────────────────────────────▶ return
//!                          ├─ Pending(gate) ─ unlock ─ gate.wait() ──▶ return
//!                          └─ missing ─ insert Pending(gate) ─ unlock
//!                                 │
//!                                 ▼
//!                          source.get(k)            (no lock held)
//!                                 │
//!                          lock ─ Resolved / remove ─ unlock
//!                                 │
//!                          gate.complete(outcome) ───────────────────▶ return
//! ```
//!
//! The segment lock is only held for bookkeeping, never across the source
//! call, so a slow fetch delays nobody except callers waiting for that same
//! key.
//!
//! ## Failure Handling
//!
//! - A source error is handed to the owner and to every waiter of that fetch,
//!   and the Pending marker is removed. The next `get` for the key fetches
//!   again.
//! - If the source panics, a drop guard removes the Pending marker and marks
//!   the gate abandoned. Waiters wake up and retry from the top, so one of
//!   them becomes the new owner.
//!
//! # Example
//!
//! ```
//! use dbcache::{source, ReadThroughCache};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let calls = AtomicUsize::new(0);
//! let cache = ReadThroughCache::new(source::from_fn(|key: &String| {
//!     calls.fetch_add(1, Ordering::SeqCst);
//!     Ok::<_, String>(key.parse::<u64>().ok())
//! }));
//!
//! assert_eq!(cache.get("42").unwrap().as_deref(), Some(&42));
//! assert_eq!(cache.get("42").unwrap().as_deref(), Some(&42));
//! assert_eq!(cache.get("not a number").unwrap(), None);
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! ```

use crate::config::ReadThroughCacheConfig;
use crate::entry::{Resolved, Slot};
use crate::gate::Gate;
use crate::metrics::{CacheMetrics, ReadThroughMetrics};
use crate::source::DataSource;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "hashbrown")]
use hashbrown::{DefaultHashBuilder, HashMap};

#[cfg(not(feature = "hashbrown"))]
use std::collections::{hash_map::RandomState as DefaultHashBuilder, HashMap};

type Segment<K, V, E, S> = Mutex<HashMap<K, Slot<V, E>, S>>;

/// What a `get` call found under the segment lock.
enum Lookup<V, E> {
    Hit(Resolved<V>),
    Join(Arc<Gate<V, E>>),
    Fetch(Arc<Gate<V, E>>),
}

/// A thread-safe read-through cache that coalesces concurrent misses.
///
/// # Type Parameters
///
/// - `K`: Key type. Must implement `Hash + Eq + Clone`.
/// - `V`: Value type. Handed out as `Arc<V>`, so no `Clone` bound.
/// - `D`: The [`DataSource`] consulted on a miss.
/// - `S`: Hash builder type. Defaults to `DefaultHashBuilder`.
///
/// # Guarantees
///
/// - For every key, at most one `D::get` call is in flight at a time.
/// - Once the source answers `Ok(Some(_))` or `Ok(None)`, it is never asked
///   about that key again.
/// - Every caller that waited on the same fetch observes the same outcome.
///
/// # Example
///
/// ```
/// use dbcache::{source, ReadThroughCache};
/// use std::sync::Arc;
/// use std::thread;
///
/// let cache = Arc::new(ReadThroughCache::new(source::from_fn(|key: &u32| {
///     Ok::<_, ()>(Some(key * 10))
/// })));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let cache = Arc::clone(&cache);
///         thread::spawn(move || *cache.get(&7).unwrap().unwrap())
///     })
///     .collect();
///
/// for h in handles {
///     assert_eq!(h.join().unwrap(), 70);
/// }
/// ```
pub struct ReadThroughCache<K, V, D, S = DefaultHashBuilder>
where
    D: DataSource<K, V>,
{
    segments: Box<[Segment<K, V, D::Error, S>]>,
    hash_builder: S,
    source: D,
    metrics: ReadThroughMetrics,
}

impl<K, V, D> ReadThroughCache<K, V, D, DefaultHashBuilder>
where
    K: Hash + Eq + Clone,
    D: DataSource<K, V>,
{
    /// Creates a cache in front of `source` with the default configuration.
    pub fn new(source: D) -> Self {
        Self::init(ReadThroughCacheConfig::new(), source, None)
    }

    /// Creates a cache from a configuration with an optional hasher.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration specifying the segment count
    /// * `source` - The data source consulted on misses
    /// * `hasher` - Optional custom hash builder. If `None`, uses `DefaultHashBuilder`
    pub fn init(
        config: ReadThroughCacheConfig,
        source: D,
        hasher: Option<DefaultHashBuilder>,
    ) -> Self {
        Self::init_with_hasher(config, source, hasher.unwrap_or_default())
    }
}

impl<K, V, D, S> ReadThroughCache<K, V, D, S>
where
    K: Hash + Eq + Clone,
    D: DataSource<K, V>,
    S: BuildHasher + Clone,
{
    /// Creates a cache with a custom hash builder.
    ///
    /// The hash builder is cloned into every segment and also used to pick
    /// the segment for a key.
    pub fn init_with_hasher(config: ReadThroughCacheConfig, source: D, hash_builder: S) -> Self {
        let segments: Vec<_> = (0..config.segments())
            .map(|_| Mutex::new(HashMap::with_hasher(hash_builder.clone())))
            .collect();

        Self {
            segments: segments.into_boxed_slice(),
            hash_builder,
            source,
            metrics: ReadThroughMetrics::new(),
        }
    }

    /// Returns the segment index for the given key.
    #[inline]
    fn segment_index<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        (self.hash_builder.hash_one(key) as usize) % self.segments.len()
    }

    /// Returns the value for `key`, reading through to the data source on a miss.
    ///
    /// - `Ok(Some(value))`: the source has a value for the key
    /// - `Ok(None)`: the source reported the key as unknown
    /// - `Err(e)`: the source failed; nothing is cached and the next call retries
    ///
    /// If another thread is already fetching `key`, this call blocks until
    /// that fetch finishes and returns its outcome instead of calling the
    /// source again.
    pub fn get<Q>(&self, key: &Q) -> Result<Option<Arc<V>>, D::Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + ToOwned<Owned = K>,
    {
        self.get_resolved(key).map(Resolved::into_value)
    }

    /// Like [`get`](Self::get), but returns the cached answer as a [`Resolved`].
    pub fn get_resolved<Q>(&self, key: &Q) -> Result<Resolved<V>, D::Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + ToOwned<Owned = K>,
    {
        let idx = self.segment_index(key);
        loop {
            let lookup = {
                let mut segment = self.segments[idx].lock();
                match segment.get(key) {
                    Some(Slot::Resolved(resolved)) => Lookup::Hit(resolved.clone()),
                    Some(Slot::Pending(gate)) => Lookup::Join(Arc::clone(gate)),
                    None => {
                        let gate = Arc::new(Gate::new());
                        segment.insert(key.to_owned(), Slot::Pending(Arc::clone(&gate)));
                        Lookup::Fetch(gate)
                    }
                }
            };

            match lookup {
                Lookup::Hit(resolved) => {
                    trace!("cache hit in segment {idx}");
                    self.metrics.record_hit(resolved.is_present());
                    return Ok(resolved);
                }
                Lookup::Join(gate) => {
                    debug!("joining in-flight fetch in segment {idx}");
                    self.metrics.record_coalesced();
                    match gate.wait() {
                        Some(outcome) => return outcome,
                        None => debug!("in-flight fetch abandoned, retrying"),
                    }
                }
                Lookup::Fetch(gate) => {
                    self.metrics.record_miss();
                    return self.fetch(idx, key.to_owned(), &gate);
                }
            }
        }
    }

    /// Calls the source for `key` and publishes the outcome. The caller has
    /// already installed a Pending slot holding `gate`.
    fn fetch(
        &self,
        idx: usize,
        key: K,
        gate: &Arc<Gate<V, D::Error>>,
    ) -> Result<Resolved<V>, D::Error> {
        debug!("cache miss in segment {idx}, fetching from source");
        let mut guard = PendingGuard {
            segment: &self.segments[idx],
            key: &key,
            gate,
            metrics: &self.metrics,
            armed: true,
        };

        self.metrics.record_fetch();
        let outcome = self.source.get(&key).map(Resolved::from);

        // On unwind `segment` is released before `guard` relocks it.
        {
            let mut segment = self.segments[idx].lock();
            match &outcome {
                Ok(resolved) => {
                    if let Some(slot) = segment.get_mut(&key) {
                        *slot = Slot::Resolved(resolved.clone());
                    }
                }
                Err(_) => {
                    segment.remove(&key);
                }
            }
        }
        guard.armed = false;

        match &outcome {
            Ok(resolved) => debug!(
                "fetch resolved in segment {idx} (present: {})",
                resolved.is_present()
            ),
            Err(_) => {
                warn!("data source failed in segment {idx}; key left uncached");
                self.metrics.record_source_error();
            }
        }

        gate.complete(outcome.clone());
        outcome
    }

    /// Returns the cached answer for `key` without consulting the source.
    ///
    /// Returns `None` if the key has not been resolved yet, including while a
    /// fetch for it is in flight.
    pub fn peek<Q>(&self, key: &Q) -> Option<Resolved<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.segment_index(key);
        let segment = self.segments[idx].lock();
        match segment.get(key) {
            Some(Slot::Resolved(resolved)) => Some(resolved.clone()),
            Some(Slot::Pending(_)) | None => None,
        }
    }

    /// Returns `true` if the cache holds a resolved answer (value or absence)
    /// for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.segment_index(key);
        let segment = self.segments[idx].lock();
        matches!(segment.get(key), Some(Slot::Resolved(_)))
    }

    /// Returns `true` if a fetch for `key` is currently in flight.
    pub fn is_pending<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.segment_index(key);
        let segment = self.segments[idx].lock();
        matches!(segment.get(key), Some(Slot::Pending(_)))
    }

    /// Returns the number of resolved entries across all segments.
    ///
    /// Note: This acquires a lock on each segment sequentially, so the
    /// returned value may be slightly stale in high-concurrency scenarios.
    pub fn len(&self) -> usize {
        self.count(|slot| matches!(slot, Slot::Resolved(_)))
    }

    /// Returns `true` if no key has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of fetches currently in flight.
    pub fn pending_count(&self) -> usize {
        self.count(|slot| matches!(slot, Slot::Pending(_)))
    }

    fn count(&self, pred: impl Fn(&Slot<V, D::Error>) -> bool) -> usize {
        self.segments
            .iter()
            .map(|s| s.lock().values().filter(|slot| pred(slot)).count())
            .sum()
    }

    /// Returns the number of segments in the cache.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the data source this cache reads through to.
    pub fn source(&self) -> &D {
        &self.source
    }

    /// Returns the live usage counters.
    pub fn stats(&self) -> &ReadThroughMetrics {
        &self.metrics
    }
}

impl<K, V, D, S> CacheMetrics for ReadThroughCache<K, V, D, S>
where
    D: DataSource<K, V>,
{
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "ReadThrough"
    }
}

impl<K, V, D, S> core::fmt::Debug for ReadThroughCache<K, V, D, S>
where
    D: DataSource<K, V>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReadThroughCache")
            .field("segment_count", &self.segments.len())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// Rolls back a Pending slot if the fetch owner unwinds before publishing.
struct PendingGuard<'a, K, V, E, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    segment: &'a Segment<K, V, E, S>,
    key: &'a K,
    gate: &'a Arc<Gate<V, E>>,
    metrics: &'a ReadThroughMetrics,
    armed: bool,
}

impl<K, V, E, S> Drop for PendingGuard<'_, K, V, E, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut segment = self.segment.lock();
            // Only remove the marker this fetch installed.
            if matches!(segment.get(self.key), Some(Slot::Pending(g)) if Arc::ptr_eq(g, self.gate))
            {
                segment.remove(self.key);
            }
        }
        warn!("fetch abandoned before completion; waiters will retry");
        self.metrics.record_abandoned();
        self.gate.abandon();
    }
}
