//! LRU cache for interpolation weights.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::weights::InterpolationWeights;
use super::InterpolationMethod;
use crate::error::Result;

/// Cache key: (source geometry identity, target geometry identity, method).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeightKey {
    pub source: u64,
    pub target: u64,
    pub method: InterpolationMethod,
}

impl WeightKey {
    pub fn new(source: u64, target: u64, method: InterpolationMethod) -> Self {
        Self {
            source,
            target,
            method,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Caller-owned store of computed weights.
///
/// Weights are never invalidated; the least recently used set is dropped
/// once `capacity` sets are held.
pub struct WeightCache {
    cache: LruCache<WeightKey, Arc<InterpolationWeights>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl std::fmt::Debug for WeightCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightCache")
            .field("capacity", &self.cache.cap())
            .field("stats", &self.stats())
            .finish()
    }
}

impl WeightCache {
    /// Create a cache holding at most `capacity` weight sets (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Return the cached weights for `key`, computing and storing them on a
    /// miss. A failed computation stores nothing.
    pub fn get_or_compute<F>(&mut self, key: WeightKey, compute: F) -> Result<Arc<InterpolationWeights>>
    where
        F: FnOnce() -> Result<InterpolationWeights>,
    {
        if let Some(weights) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(method = %key.method, "Weight cache hit");
            return Ok(Arc::clone(weights));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let weights = Arc::new(compute()?);
        if self.cache.push(key, Arc::clone(&weights)).is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        debug!(method = %key.method, entries = self.cache.len(), "Weight cache miss");
        Ok(weights)
    }

    /// Check if a key exists in the cache without updating LRU order.
    pub fn contains(&self, key: &WeightKey) -> bool {
        self.cache.contains(key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
