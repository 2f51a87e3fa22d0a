//! Memoisation of nearest-ancestor lookups.
//!
//! Many TPUUs share an MPUU and many MPUUs share MPs, so the projector asks
//! the same `(concept, classification)` question repeatedly. Results are
//! kept in an LRU cache behind a mutex so parallel projection can share it.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use amt_types::{Classification, SctId};
use lru::LruCache;
use parking_lot::Mutex;

use crate::config::ResolverCacheConfig;

type CacheKey = (SctId, Classification);

/// Thread-safe LRU cache of nearest-ancestor results.
///
/// # Example
///
/// ```ignore
/// use amt_flatfile::AncestorCache;
/// use amt_flatfile::ResolverCacheConfig;
/// use amt_types::Classification;
///
/// let cache = AncestorCache::new(&ResolverCacheConfig::default());
/// cache.set(100, Classification::Mp, vec![10, 20]);
///
/// assert_eq!(cache.get(100, Classification::Mp), Some(vec![10, 20]));
/// ```
pub struct AncestorCache {
    inner: Mutex<LruCache<CacheKey, Vec<SctId>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AncestorCache {
    /// Creates a cache with the given configuration.
    pub fn new(config: &ResolverCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Gets a cached result, promoting it to most-recently-used.
    pub fn get(&self, concept_id: SctId, classification: Classification) -> Option<Vec<SctId>> {
        let result = self.inner.lock().get(&(concept_id, classification)).cloned();
        let counter = if result.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        result
    }

    /// Stores a result, evicting the least recently used entry when full.
    pub fn set(&self, concept_id: SctId, classification: Classification, result: Vec<SctId>) {
        self.inner.lock().put((concept_id, classification), result);
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all entries and counters.
    pub fn clear(&self) {
        self.inner.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for AncestorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("AncestorCache")
            .field("entries", &stats.entries)
            .field("hits", &stats.hits)
            .field("misses", &stats.misses)
            .finish()
    }
}

/// Statistics about cache use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently cached.
    pub entries: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that missed.
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
