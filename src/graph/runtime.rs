//! runtime.rs
//! Derived data cached on a tree. Every cache is a `CacheMutex`: an explicit
//! double-checked "compute once" gate. Readers that find the value valid never
//! take the compute lock; a dirty value is recomputed by exactly one thread
//! while the others wait on the lock and then read the published result.

use crate::inference::InferenceResult;
use crate::zones::ZoneForest;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[derive(Debug)]
pub struct CacheMutex<T> {
    dirty: AtomicBool,
    compute_lock: Mutex<()>,
    value: RwLock<Option<Arc<T>>>,
}

/// Outcome of [`CacheMutex::ensure`].
#[derive(Debug)]
pub struct Refresh<T> {
    pub current: Option<Arc<T>>,
    /// The value published before this call (equal to `current` when nothing was recomputed).
    pub previous: Option<Arc<T>>,
    pub recomputed: bool,
}

impl<T> Default for CacheMutex<T> {
    fn default() -> Self {
        Self {
            dirty: AtomicBool::new(true),
            compute_lock: Mutex::new(()),
            value: RwLock::new(None),
        }
    }
}

impl<T> CacheMutex<T> {
    pub fn new() -> Self { Self::default() }

    /// Returns the cached value, computing and publishing it first if it is dirty.
    /// `compute` returning `None` publishes "no value".
    pub fn ensure(&self, compute: impl FnOnce() -> Option<T>) -> Refresh<T> {
        if !self.dirty.load(Ordering::Acquire) {
            return self.unchanged();
        }
        let _guard = self.compute_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have finished while we waited for the lock.
        if !self.dirty.load(Ordering::Acquire) {
            return self.unchanged();
        }

        let current = compute().map(Arc::new);
        let previous = {
            let mut slot = self.value.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, current.clone())
        };
        self.dirty.store(false, Ordering::Release);
        Refresh { current, previous, recomputed: true }
    }

    /// Marks the value stale. The stale value stays readable through `get`
    /// until the next `ensure` replaces it.
    pub fn tag_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Last published value, possibly stale.
    pub fn get(&self) -> Option<Arc<T>> {
        self.value.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn unchanged(&self) -> Refresh<T> {
        let current = self.get();
        Refresh { previous: current.clone(), current, recomputed: false }
    }
}

/// Per-tree cached analysis results.
#[derive(Debug, Default)]
pub struct TreeRuntime {
    pub anonymous_attribute_inferencing: CacheMutex<InferenceResult>,
    pub tree_zones: CacheMutex<ZoneForest>,
}

impl TreeRuntime {
    pub fn tag_topology_changed(&self) {
        self.anonymous_attribute_inferencing.tag_dirty();
        self.tree_zones.tag_dirty();
    }
}
