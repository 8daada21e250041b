//! Keyed compute-once cache.
//!
//! Several tables in the compiler are shared across worker threads and filled on demand: resolve helpers per class,
//! decoded symbol-cache entries, library hits. They all follow the same shape: look up a key, and if it is missing,
//! compute the value exactly once even when many threads ask at the same time.
//!
//! [`KeyedCache`] keeps one [`OnceLock`] per key behind a `RwLock`ed map. The map lock is only held long enough to
//! fetch or insert the cell; the value itself is computed outside of it, so a slow computation for one key never
//! blocks lookups of another.
//!
//! ## Notes
//!
//! - An initializer must not ask the same cache for the same key (that would deadlock on the cell).
//! - Poisoned locks are recovered: the map only ever holds fully-inserted cells.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use rustc_hash::FxHashMap;

pub struct KeyedCache<K, V> {
    cells: RwLock<FxHashMap<K, Arc<OnceLock<V>>>>,
}

impl<K, V> Default for KeyedCache<K, V> {
    fn default() -> Self {
        Self {
            cells: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, computing it with `init` if no thread has done so yet.
    pub fn get_or_init<Q>(&self, key: &Q, init: impl FnOnce() -> V) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.cell(key).get_or_init(init).clone()
    }

    /// Return the value for `key` only if it has already been computed.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let cells = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Forget the value for `key`; the next lookup recomputes it.
    pub fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.cells.write().unwrap_or_else(PoisonError::into_inner).remove(key);
    }

    /// Drop every computed entry for which `keep` returns `false`. Cells still being computed stay.
    pub fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) {
        let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
        cells.retain(|k, cell| cell.get().is_none_or(|v| keep(k, v)));
    }

    pub fn clear(&self) {
        self.cells.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Number of keys with a cell (computed or in flight).
    pub fn len(&self) -> usize {
        self.cells.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell<Q>(&self, key: &Q) -> Arc<OnceLock<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(cell) = self.cells.read().unwrap_or_else(PoisonError::into_inner).get(key) {
            return Arc::clone(cell);
        }
        let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cells.entry(key.to_owned()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_computes_once_per_key() {
        let cache: KeyedCache<String, usize> = KeyedCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = cache.get_or_init("a", || {
                calls.fetch_add(1, Ordering::SeqCst);
                7
            });
            assert_eq!(v, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("a"), Some(7));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_remove_forces_recompute() {
        let cache: KeyedCache<String, usize> = KeyedCache::new();
        cache.get_or_init("k", || 1);
        cache.remove("k");
        assert_eq!(cache.get_or_init("k", || 2), 2);
    }

    #[test]
    fn test_retain_drops_rejected_values() {
        let cache: KeyedCache<String, usize> = KeyedCache::new();
        cache.get_or_init("odd", || 1);
        cache.get_or_init("even", || 2);
        cache.retain(|_, v| v % 2 == 0);
        assert_eq!(cache.get("odd"), None);
        assert_eq!(cache.get("even"), Some(2));
    }

    #[test]
    fn test_concurrent_callers_share_one_computation() {
        let cache: KeyedCache<String, usize> = KeyedCache::new();
        let calls = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    cache.get_or_init("shared", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        42
                    })
                });
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
