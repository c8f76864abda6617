//! Single-use completion gate.
//!
//! A [`Gate`] is created together with a key's Pending marker and shared (via
//! `Arc`) between the fetch owner and every caller that arrives while the fetch
//! is in flight. The owner opens it exactly once, either with the fetch
//! outcome or by abandoning it; waiters block on a `parking_lot::Condvar`
//! until that happens.

use crate::entry::Resolved;
use parking_lot::{Condvar, Mutex};

enum GateState<V, E> {
    Waiting,
    Done(Result<Resolved<V>, E>),
    Abandoned,
}

pub(crate) struct Gate<V, E> {
    state: Mutex<GateState<V, E>>,
    opened: Condvar,
}

impl<V, E> Gate<V, E> {
    pub(crate) fn new() -> Self {
        Gate {
            state: Mutex::new(GateState::Waiting),
            opened: Condvar::new(),
        }
    }

    /// Publishes the fetch outcome and wakes every waiter.
    pub(crate) fn complete(&self, outcome: Result<Resolved<V>, E>) {
        self.open(GateState::Done(outcome));
    }

    /// Wakes every waiter without an outcome; they go back and retry.
    pub(crate) fn abandon(&self) {
        self.open(GateState::Abandoned);
    }

    fn open(&self, next: GateState<V, E>) {
        let mut state = self.state.lock();
        debug_assert!(matches!(*state, GateState::Waiting), "gate opened twice");
        *state = next;
        drop(state);
        self.opened.notify_all();
    }

    /// Blocks until the gate opens.
    ///
    /// Returns `None` when the owner abandoned the fetch.
    pub(crate) fn wait(&self) -> Option<Result<Resolved<V>, E>>
    where
        E: Clone,
    {
        let mut state = self.state.lock();
        loop {
            match &*state {
                GateState::Waiting => self.opened.wait(&mut state),
                GateState::Done(outcome) => return Some(outcome.clone()),
                GateState::Abandoned => return None,
            }
        }
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        !matches!(*self.state.lock(), GateState::Waiting)
    }
}
