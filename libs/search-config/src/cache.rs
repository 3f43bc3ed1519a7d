//! Explicit resolution cache
//!
//! Resolved option sets and facet settings are expensive enough to keep
//! around, but must never go stale silently: entries live until
//! [`ResolutionCache::invalidate_all`] is called. There is no TTL.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug)]
pub struct ResolutionCache<V> {
    entries: RwLock<HashMap<String, Arc<V>>>,
}

impl<V> Default for ResolutionCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ResolutionCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// When two callers race on the same key, the first stored value wins and
    /// both receive the same `Arc`.
    pub fn get_or_compute<E, F>(&self, key: &str, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }

        let computed = Arc::new(compute()?);
        let mut entries = self.entries.write().unwrap();
        let stored = entries
            .entry(key.to_string())
            .or_insert_with(|| computed.clone());
        Ok(stored.clone())
    }

    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.entries.read().unwrap().get(key).cloned()
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write().unwrap();
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "Resolution cache invalidated");
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn computes_once_until_invalidated() {
        let cache: ResolutionCache<String> = ResolutionCache::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, ()>("value".to_string())
        };

        let first = cache.get_or_compute("k", compute).unwrap();
        let second = cache.get_or_compute("k", compute).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);

        cache.invalidate_all();
        assert!(cache.is_empty());

        let third = cache.get_or_compute("k", compute).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache: ResolutionCache<u32> = ResolutionCache::new();
        let failed: Result<_, &str> = cache.get_or_compute("k", || Err("boom"));
        assert!(failed.is_err());
        assert!(cache.get("k").is_none());

        let ok: Result<_, &str> = cache.get_or_compute("k", || Ok(7));
        assert_eq!(*ok.unwrap(), 7);
    }
}
