//! Data Source Contract
//!
//! A [`DataSource`] is whatever sits behind the cache: a database, a remote
//! service, a file index. The cache only ever asks it one question, "what is
//! the value for this key?", and accepts three answers:
//!
//! | Answer | Meaning | Cached? |
//! |--------|---------|---------|
//! | `Ok(Some(v))` | The key resolves to `v` | Yes |
//! | `Ok(None)` | The key is valid but unknown to the source | Yes |
//! | `Err(e)` | Resolution itself failed | No |
//!
//! Sources may be slow and may be called from many threads at once. They do
//! not need to de-duplicate requests themselves; the cache makes sure only one
//! call per key is outstanding.
//!
//! # Example
//!
//! ```
//! use dbcache::source::{self, DataSource};
//!
//! let squares = source::from_fn(|key: &u32| -> Result<Option<u32>, String> {
//!     Ok(key.checked_mul(*key))
//! });
//! assert_eq!(squares.get(&12), Ok(Some(144)));
//! ```

use core::fmt;
use std::sync::Arc;

/// A keyed provider of values that a [`ReadThroughCache`](crate::ReadThroughCache)
/// reads through to on a miss.
///
/// `Error` must be `Clone` because a single failed fetch is handed verbatim to
/// every caller that was waiting on it.
pub trait DataSource<K, V> {
    /// The failure type returned when a key cannot be resolved.
    type Error: Clone;

    /// Resolves `key` to a value, to `None` if the source has no such key,
    /// or to an error if the lookup failed.
    fn get(&self, key: &K) -> Result<Option<V>, Self::Error>;
}

impl<K, V, D> DataSource<K, V> for &D
where
    D: DataSource<K, V> + ?Sized,
{
    type Error = D::Error;

    #[inline]
    fn get(&self, key: &K) -> Result<Option<V>, Self::Error> {
        (**self).get(key)
    }
}

impl<K, V, D> DataSource<K, V> for Box<D>
where
    D: DataSource<K, V> + ?Sized,
{
    type Error = D::Error;

    #[inline]
    fn get(&self, key: &K) -> Result<Option<V>, Self::Error> {
        (**self).get(key)
    }
}

impl<K, V, D> DataSource<K, V> for Arc<D>
where
    D: DataSource<K, V> + ?Sized,
{
    type Error = D::Error;

    #[inline]
    fn get(&self, key: &K) -> Result<Option<V>, Self::Error> {
        (**self).get(key)
    }
}

/// A [`DataSource`] backed by a closure. Created with [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
}

/// Wraps a closure as a [`DataSource`].
///
/// Handy for tests and for sources that are a single function call.
pub fn from_fn<K, V, E, F>(f: F) -> FromFn<F>
where
    F: Fn(&K) -> Result<Option<V>, E>,
    E: Clone,
{
    FromFn { f }
}

impl<K, V, E, F> DataSource<K, V> for FromFn<F>
where
    F: Fn(&K) -> Result<Option<V>, E>,
    E: Clone,
{
    type Error = E;

    #[inline]
    fn get(&self, key: &K) -> Result<Option<V>, E> {
        (self.f)(key)
    }
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}
