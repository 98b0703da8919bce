//! Two-tier retrieval cache (§4.4): an in-memory LRU+TTL tier backed by the
//! persisted `search_cache` table, with an opt-in semantic near-hit
//! fallback.
//!
//! The in-memory tier keeps an LRU map behind a lock with its own metrics
//! and an `invalidate_all` admin op; the persisted tier is delegated to
//! [`crate::storage::StorageBackend`] rather than a second in-process map,
//! so a restart still finds cached rows from before it.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::constants::{defaults, logging};
use crate::error::Result;
use crate::math::cosine_similarity;
use crate::storage::{CacheRow, StorageBackend};
use crate::types::SearchOptions;
use crate::types::SearchResult;

use super::metrics::CacheMetrics;

struct MemoryEntry {
    results: Vec<SearchResult>,
    inserted_at: Instant,
}

/// The two-tier query-result cache described in §4.4.
pub struct RetrievalCache {
    memory: Mutex<LruCache<String, MemoryEntry>>,
    ttl: Duration,
    /// TTL applied to the persisted tier (and the semantic near-hit scan
    /// over persisted rows). Kept independent of `ttl` so a row evicted
    /// from the in-memory LRU — or never loaded into it after a restart —
    /// can still serve a hit from storage.
    persisted_ttl: Duration,
    semantic_near_hit_enabled: bool,
    semantic_near_hit_threshold: f32,
    metrics: Mutex<CacheMetrics>,
}

impl RetrievalCache {
    /// Construct a cache with the §4.4 default in-memory TTL (5 minutes),
    /// the default persisted-tier TTL, and the opt-in semantic near-hit
    /// path disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(defaults::QUERY_CACHE_TTL, false, defaults::SEMANTIC_NEAR_HIT_THRESHOLD)
    }

    /// Construct a cache with an explicit in-memory TTL and semantic
    /// near-hit policy; the persisted tier uses the default, longer-lived
    /// TTL. Use [`RetrievalCache::with_config_and_persisted_ttl`] to
    /// override both independently.
    #[must_use]
    pub fn with_config(ttl: Duration, semantic_near_hit_enabled: bool, semantic_near_hit_threshold: f32) -> Self {
        Self::with_config_and_persisted_ttl(
            ttl,
            defaults::PERSISTED_QUERY_CACHE_TTL,
            semantic_near_hit_enabled,
            semantic_near_hit_threshold,
        )
    }

    /// Construct a cache with independent in-memory and persisted-tier
    /// TTLs, plus the semantic near-hit policy.
    #[must_use]
    pub fn with_config_and_persisted_ttl(
        ttl: Duration,
        persisted_ttl: Duration,
        semantic_near_hit_enabled: bool,
        semantic_near_hit_threshold: f32,
    ) -> Self {
        let capacity = NonZeroUsize::new(10_000).unwrap_or(NonZeroUsize::new(1).expect("1 is nonzero"));
        Self {
            memory: Mutex::new(LruCache::new(capacity)),
            ttl,
            persisted_ttl,
            semantic_near_hit_enabled,
            semantic_near_hit_threshold,
            metrics: Mutex::new(CacheMetrics::default()),
        }
    }

    /// Look up a cached result list for `options`.
    ///
    /// Checks the in-memory tier first, then the persisted `search_cache`
    /// table (filtered to rows created within the TTL), and finally — only
    /// if enabled — the semantic near-hit path over every persisted row's
    /// stored query embedding. A persisted or semantic hit is promoted back
    /// into the in-memory tier.
    #[instrument(skip(self, storage, query_embedding), fields(prefix = logging::PREFIX_CACHE))]
    pub async fn lookup(
        &self,
        storage: &dyn StorageBackend,
        options: &SearchOptions,
        query_embedding: &[f32],
    ) -> Option<Vec<SearchResult>> {
        let fingerprint = options.fingerprint();

        if let Some(results) = self.lookup_memory(&fingerprint) {
            self.metrics.lock().hits += 1;
            debug!(prefix = logging::PREFIX_CACHE, "in-memory hit");
            return Some(results);
        }

        let now = Utc::now();
        if let Ok(Some(row)) = storage.get_cache_row(&fingerprint).await {
            if self.is_fresh(row.created_at, now) {
                self.put_memory(fingerprint, row.results.clone());
                self.metrics.lock().hits += 1;
                debug!(prefix = logging::PREFIX_CACHE, "persisted hit");
                return Some(row.results);
            }
        }

        if self.semantic_near_hit_enabled {
            if let Some(results) = self.semantic_near_hit(storage, query_embedding, now).await {
                self.metrics.lock().semantic_near_hits += 1;
                debug!(prefix = logging::PREFIX_CACHE, "semantic near-hit");
                return Some(results);
            }
        }

        self.metrics.lock().misses += 1;
        None
    }

    /// Store `results` in both tiers.
    ///
    /// # Errors
    /// Returns an error if the persisted write fails; the in-memory tier is
    /// still updated regardless, since it has no external failure mode.
    pub async fn store(
        &self,
        storage: &dyn StorageBackend,
        options: &SearchOptions,
        query_embedding: Vec<f32>,
        results: Vec<SearchResult>,
    ) -> Result<()> {
        let fingerprint = options.fingerprint();
        self.put_memory(fingerprint.clone(), results.clone());
        storage
            .put_cache_row(CacheRow {
                fingerprint,
                results,
                query_embedding,
                created_at: Utc::now(),
            })
            .await
    }

    /// Admin `clear` operation (§4.4): drop every entry in both tiers.
    pub async fn clear(&self, storage: &dyn StorageBackend) -> Result<()> {
        let evicted = self.memory.lock().len() as u64;
        self.memory.lock().clear();
        storage.clear_cache().await?;
        let mut metrics = self.metrics.lock();
        metrics.evictions += evicted;
        Ok(())
    }

    /// A snapshot of the cache's hit/miss/eviction counters.
    #[must_use]
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.lock().clone()
    }

    fn lookup_memory(&self, fingerprint: &str) -> Option<Vec<SearchResult>> {
        let mut guard = self.memory.lock();
        let expired = guard
            .peek(fingerprint)
            .is_some_and(|e| e.inserted_at.elapsed() > self.ttl);
        if expired {
            guard.pop(fingerprint);
            self.metrics.lock().evictions += 1;
            return None;
        }
        guard.get(fingerprint).map(|e| e.results.clone())
    }

    fn put_memory(&self, fingerprint: String, results: Vec<SearchResult>) {
        self.memory.lock().put(
            fingerprint,
            MemoryEntry {
                results,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Whether a persisted row (or semantic-near-hit candidate) created at
    /// `created_at` is still fresh under the persisted-tier TTL, which is
    /// independent of the in-memory tier's TTL.
    fn is_fresh(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::from_std(self.persisted_ttl).unwrap_or(chrono::Duration::zero());
        now - created_at <= ttl
    }

    async fn semantic_near_hit(
        &self,
        storage: &dyn StorageBackend,
        query_embedding: &[f32],
        now: DateTime<Utc>,
    ) -> Option<Vec<SearchResult>> {
        if query_embedding.iter().all(|x| *x == 0.0) {
            return None;
        }
        let rows = storage.all_cache_rows().await.ok()?;
        rows.into_iter()
            .filter(|row| self.is_fresh(row.created_at, now))
            .map(|row| {
                let sim = cosine_similarity(query_embedding, &row.query_embedding);
                (sim, row)
            })
            .filter(|(sim, _)| *sim >= self.semantic_near_hit_threshold)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, row)| row.results)
    }
}

impl Default for RetrievalCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::types::{Entity, Explanation, MatchedItem};

    fn sample_results() -> Vec<SearchResult> {
        let e = Entity::new("Alice", "Person", Utc::now());
        vec![SearchResult::new(
            MatchedItem::Entity(e),
            0.9,
            Explanation::default(),
        )]
    }

    #[tokio::test]
    async fn store_then_lookup_round_trips_within_ttl() {
        let cache = RetrievalCache::new();
        let storage = InMemoryStorage::new();
        let options = SearchOptions::new("Alice");
        let embedding = vec![1.0, 0.0];
        cache
            .store(&storage, &options, embedding.clone(), sample_results())
            .await
            .unwrap();

        let hit = cache.lookup(&storage, &options, &embedding).await;
        assert!(hit.is_some());
        assert_eq!(cache.metrics().hits, 1);
    }

    #[tokio::test]
    async fn miss_on_unrelated_query() {
        let cache = RetrievalCache::new();
        let storage = InMemoryStorage::new();
        let options = SearchOptions::new("Bob");
        let hit = cache.lookup(&storage, &options, &[0.0, 1.0]).await;
        assert!(hit.is_none());
        assert_eq!(cache.metrics().misses, 1);
    }

    #[tokio::test]
    async fn persisted_tier_serves_a_hit_after_memory_eviction() {
        // A 1ms in-memory TTL guarantees the in-memory tier has expired the
        // entry by the time `lookup` runs; the persisted tier's own
        // (much longer) TTL is what must still serve the hit.
        let cache = RetrievalCache::with_config(Duration::from_millis(1), false, 0.95);
        let storage = InMemoryStorage::new();
        let options = SearchOptions::new("Alice");
        let embedding = vec![1.0, 0.0];
        cache
            .store(&storage, &options, embedding.clone(), sample_results())
            .await
            .unwrap();

        std::thread::sleep(Duration::from_millis(5));
        let hit = cache.lookup(&storage, &options, &embedding).await;
        assert!(
            hit.is_some(),
            "persisted row should still be within the persisted tier's own TTL even though the in-memory tier has expired"
        );
    }

    #[tokio::test]
    async fn persisted_tier_respects_its_own_ttl_independent_of_the_in_memory_one() {
        // A long in-memory TTL but a 1ms persisted TTL: the in-memory tier
        // would still consider the entry fresh, but a direct persisted-row
        // lookup (bypassing the in-memory tier) must honour its own TTL.
        let cache = RetrievalCache::with_config_and_persisted_ttl(
            Duration::from_secs(300),
            Duration::from_millis(1),
            false,
            0.95,
        );
        let storage = InMemoryStorage::new();
        let options = SearchOptions::new("Alice");
        let row = CacheRow {
            fingerprint: options.fingerprint(),
            results: sample_results(),
            query_embedding: vec![1.0, 0.0],
            created_at: Utc::now(),
        };
        storage.put_cache_row(row).await.unwrap();

        std::thread::sleep(Duration::from_millis(5));
        let hit = cache.lookup(&storage, &options, &[1.0, 0.0]).await;
        assert!(hit.is_none(), "a persisted row past its own TTL must not hit, even with no in-memory entry to conflict with it");
    }

    #[tokio::test]
    async fn semantic_near_hit_matches_close_query_when_enabled() {
        let cache = RetrievalCache::with_config(Duration::from_secs(300), true, 0.95);
        let storage = InMemoryStorage::new();
        let options = SearchOptions::new("Alice prefers TypeScript");
        let embedding = vec![1.0, 0.0, 0.0];
        cache
            .store(&storage, &options, embedding.clone(), sample_results())
            .await
            .unwrap();

        let near_query = SearchOptions::new("completely different cache key");
        let near_embedding = vec![0.999, 0.001, 0.0];
        let hit = cache.lookup(&storage, &near_query, &near_embedding).await;
        assert!(hit.is_some());
        assert_eq!(cache.metrics().semantic_near_hits, 1);
    }

    #[tokio::test]
    async fn clear_drops_every_entry() {
        let cache = RetrievalCache::new();
        let storage = InMemoryStorage::new();
        let options = SearchOptions::new("Alice");
        let embedding = vec![1.0, 0.0];
        cache
            .store(&storage, &options, embedding.clone(), sample_results())
            .await
            .unwrap();
        cache.clear(&storage).await.unwrap();
        let hit = cache.lookup(&storage, &options, &embedding).await;
        assert!(hit.is_none());
    }
}
