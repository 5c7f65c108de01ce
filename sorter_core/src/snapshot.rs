//! Copy-on-write snapshot cell.
//!
//! Shared mutable state in the core (ring configuration, head position,
//! health status, chute table) is held as an immutable value behind an
//! `Arc`. Writers build a complete replacement and swap it in under a short
//! exclusive lock; readers clone the `Arc` and never observe a half-applied
//! update.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct SnapshotCell<T> {
    inner: Mutex<Arc<T>>,
}

impl<T> SnapshotCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Arc::new(value)),
        }
    }

    // Every stored value is immutable, so a poisoned lock still guards a
    // complete snapshot and can be used as-is.
    fn guard(&self) -> MutexGuard<'_, Arc<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.guard())
    }

    /// Replace the whole snapshot.
    pub fn store(&self, value: T) {
        *self.guard() = Arc::new(value);
    }

    /// Serialized read-modify-write. `f` sees the current snapshot and returns
    /// its replacement together with a value handed back to the caller.
    pub fn update<R>(&self, f: impl FnOnce(&T) -> (T, R)) -> R {
        let mut guard = self.guard();
        let (next, out) = f(&guard);
        *guard = Arc::new(next);
        out
    }
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for SnapshotCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("SnapshotCell").field(&*self.load()).finish()
    }
}
