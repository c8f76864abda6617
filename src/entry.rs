//! Per-Key Store State
//!
//! Every key the cache has seen is in exactly one of three states:
//!
//! ```text
//!                    first miss                 Ok(Some(v))
//!   ┌──────────┐  ───────────────▶ ┌─────────┐ ─────────────▶ ┌──────────────────┐
//!   │ uncached │                   │ Pending │                │ Resolved(Present)│
//!   └──────────┘ ◀─────────────── └─────────┘ ─────────────▶ └──────────────────┘
//!         ▲        Err(e) / panic        │       Ok(None)     ┌──────────────────┐
//!         │                              └──────────────────▶ │ Resolved(Absent) │
//!                                                             └──────────────────┘
//! ```
//!
//! "uncached" is simply the absence of the key from the store: a failed fetch
//! leaves no trace behind. Resolved states are terminal.

use crate::gate::Gate;
use core::fmt;
use std::sync::Arc;

/// What the store holds for a key.
pub(crate) enum Slot<V, E> {
    /// A fetch is in flight; late arrivals wait on the gate.
    Pending(Arc<Gate<V, E>>),
    /// The source answered; the answer is kept for the cache's lifetime.
    Resolved(Resolved<V>),
}

/// A terminal, cached answer from the data source.
///
/// Values are reference counted so every caller gets the same allocation and
/// `V` itself never needs to be `Clone`.
pub enum Resolved<V> {
    /// The source returned a value for the key.
    Present(Arc<V>),
    /// The source reported that the key does not exist.
    Absent,
}

impl<V> Resolved<V> {
    /// Returns the cached value, if any.
    #[inline]
    pub fn value(&self) -> Option<&Arc<V>> {
        match self {
            Resolved::Present(value) => Some(value),
            Resolved::Absent => None,
        }
    }

    /// Consumes the answer, returning the cached value if any.
    #[inline]
    pub fn into_value(self) -> Option<Arc<V>> {
        match self {
            Resolved::Present(value) => Some(value),
            Resolved::Absent => None,
        }
    }

    /// Returns `true` if the source had a value for the key.
    #[inline]
    pub fn is_present(&self) -> bool {
        matches!(self, Resolved::Present(_))
    }

    /// Returns `true` if the source reported the key as unknown.
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Resolved::Absent)
    }
}

impl<V> From<Option<V>> for Resolved<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(value) => Resolved::Present(Arc::new(value)),
            None => Resolved::Absent,
        }
    }
}

// Manual impl: cloning only bumps the refcount, so `V: Clone` is not required.
impl<V> Clone for Resolved<V> {
    fn clone(&self) -> Self {
        match self {
            Resolved::Present(value) => Resolved::Present(Arc::clone(value)),
            Resolved::Absent => Resolved::Absent,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Resolved<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Present(value) => f.debug_tuple("Present").field(value).finish(),
            Resolved::Absent => f.write_str("Absent"),
        }
    }
}

impl<V: PartialEq> PartialEq for Resolved<V> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Resolved::Present(a), Resolved::Present(b)) => a == b,
            (Resolved::Absent, Resolved::Absent) => true,
            _ => false,
        }
    }
}

impl<V: Eq> Eq for Resolved<V> {}
