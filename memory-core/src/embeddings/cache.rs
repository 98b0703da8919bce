//! TTL-bounded LRU cache keyed by raw input text (§4.2).
//!
//! Built on the `lru` crate with an explicit TTL check on read, narrowed to
//! the embedding service's single `text -> vector` mapping.

use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

struct Entry {
    vector: Vec<f32>,
    inserted_at: Instant,
}

/// Thread-safe TTL-bounded LRU cache of embeddings.
pub struct EmbeddingCache {
    inner: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
}

impl EmbeddingCache {
    /// Construct a cache holding at most `capacity` entries, each valid for
    /// `ttl` after insertion.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1)).unwrap_or(
            std::num::NonZeroUsize::new(1).expect("1 is nonzero"),
        );
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Look up `text`, returning `None` on a miss or an expired entry
    /// (expired entries are evicted on access).
    #[must_use]
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let mut guard = self.inner.lock();
        let expired = guard
            .peek(text)
            .is_some_and(|e| e.inserted_at.elapsed() > self.ttl);
        if expired {
            guard.pop(text);
            return None;
        }
        guard.get(text).map(|e| e.vector.clone())
    }

    /// Insert or refresh `text -> vector`.
    pub fn put(&self, text: String, vector: Vec<f32>) {
        self.inner.lock().put(
            text,
            Entry {
                vector,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Current number of entries, including any not-yet-evicted expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_returns_cached_vector() {
        let cache = EmbeddingCache::new(10, Duration::from_secs(60));
        cache.put("hello".to_string(), vec![1.0, 2.0]);
        assert_eq!(cache.get("hello"), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn miss_on_unseen_key() {
        let cache = EmbeddingCache::new(10, Duration::from_secs(60));
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn expired_entry_is_treated_as_a_miss() {
        let cache = EmbeddingCache::new(10, Duration::from_millis(1));
        cache.put("hello".to_string(), vec![1.0]);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get("hello"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = EmbeddingCache::new(1, Duration::from_secs(60));
        cache.put("a".to_string(), vec![1.0]);
        cache.put("b".to_string(), vec![2.0]);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(vec![2.0]));
    }
}
