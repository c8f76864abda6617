#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Request Flow
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         ReadThroughCache                             │
//! │                                                                      │
//! │  hash(key) % N  ──▶  Segment Selection                               │
//! │                                                                      │
//! │  ┌──────────────┐ ┌──────────────┐     ┌──────────────┐              │
//! │  │  Segment 0   │ │  Segment 1   │ ... │  Segment N-1 │              │
//! │  │  [Mutex]     │ │  [Mutex]     │     │  [Mutex]     │              │
//! │  │  key → Slot  │ │  key → Slot  │     │  key → Slot  │              │
//! │  └──────────────┘ └──────────────┘     └──────────────┘              │
//! │                                                                      │
//! │  Slot = Pending(Gate) | Resolved(Present | Absent)                   │
//! └───────────────────────────────────┬──────────────────────────────────┘
//!                                     │ miss (lock released)
//!                                     ▼
//!                               DataSource::get
//! ```
//!
//! ## Quick Reference
//!
//! | Call | Cached state | Source called? | Returns |
//! |------|--------------|----------------|---------|
//! | `get(k)` | value | no | `Ok(Some(v))` |
//! | `get(k)` | absent | no | `Ok(None)` |
//! | `get(k)` | nothing | yes, once | source's answer |
//! | `get(k)` | pending | no, waits | the in-flight fetch's answer |
//! | `peek(k)` | any | never | `Some(Resolved)` or `None` |
//!
//! ## Example
//!
//! ```rust
//! use dbcache::source::DataSource;
//! use dbcache::ReadThroughCache;
//! use dbcache::config::ReadThroughCacheConfig;
//! use std::collections::HashMap;
//!
//! #[derive(Debug, PartialEq)]
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! struct UserTable(HashMap<String, (String, u32)>);
//!
//! impl DataSource<String, User> for UserTable {
//!     type Error = String;
//!
//!     fn get(&self, key: &String) -> Result<Option<User>, String> {
//!         Ok(self
//!             .0
//!             .get(key)
//!             .map(|(name, age)| User { name: name.clone(), age: *age }))
//!     }
//! }
//!
//! let table = UserTable(HashMap::from([("1".to_string(), ("Ada".to_string(), 36))]));
//! let config = ReadThroughCacheConfig::new().with_segments(8);
//! let cache = ReadThroughCache::init(config, table, None);
//!
//! let ada = cache.get("1").unwrap().unwrap();
//! assert_eq!(ada.name, "Ada");
//! assert_eq!(cache.get("2").unwrap(), None);
//! ```
//!
//! ## Modules
//!
//! - [`cache`]: The read-through cache and its coalescing `get`
//! - [`source`]: The data source contract
//! - [`entry`]: Cached answers
//! - [`config`]: Cache configuration
//! - [`metrics`]: Usage counters

/// Per-key store state.
///
/// Provides [`Resolved`](entry::Resolved), the terminal answer cached for a
/// key, and the crate-internal slot type that also covers in-flight fetches.
pub mod entry;

/// Single-use completion gate shared by a fetch owner and its waiters.
pub(crate) mod gate;

/// Data source contract.
///
/// Provides the [`DataSource`](source::DataSource) trait the cache reads
/// through to, plus [`from_fn`](source::from_fn) for closure-backed sources.
pub mod source;

/// Cache configuration.
pub mod config;

/// Cache metrics system.
///
/// Provides usage counters for the read-through cache and the
/// [`CacheMetrics`](metrics::CacheMetrics) reporting trait.
pub mod metrics;

/// Read-through cache implementation.
///
/// Provides a thread-safe cache that calls its data source at most once per
/// key, no matter how many threads ask for that key at the same time.
pub mod cache;

pub use cache::ReadThroughCache;
pub use entry::Resolved;
pub use source::DataSource;
