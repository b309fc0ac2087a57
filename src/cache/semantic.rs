//! Similarity-keyed response cache.
//!
//! [`SemanticCache`] stores `(embedding, response)` pairs and answers a
//! lookup with the stored response whose embedding is most similar to the
//! query's, provided the similarity reaches the configured threshold.
//!
//! # Locking
//!
//! One `parking_lot::Mutex` guards the whole index. It is held only while
//! scanning or mutating the index, never across the embedding call, so
//! embeddings for concurrent requests are computed in parallel while LRU
//! bookkeeping and the capacity count stay serialised. Two concurrent
//! inserts can therefore never both see a free slot.
//!
//! # Expiry and eviction
//!
//! - Entries older than the TTL are invisible to lookups immediately.
//! - A lazy sweep physically removes them, at most once per
//!   `sweep_interval`, piggybacking on a lookup.
//! - Inserting into a full cache first drops expired entries, then the
//!   least-recently-used one. This happens inline, so `insert` never waits
//!   on background housekeeping.
//!
//! # Failure
//!
//! The cache is best-effort. [`SemanticCache::lookup`] turns every internal
//! error (embedder down, embedding timeout, no entry of a matching
//! dimension) into a miss
//! and logs it; [`SemanticCache::try_lookup`] exposes the error for callers
//! that want it.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::similarity::cosine_similarity;
use crate::telemetry;
use crate::traits::Embedder;
use crate::types::Embedding;
use crate::{HuginnError, Result};

/// Configuration for the semantic cache.
///
/// ```rust
/// # use huginn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .similarity_threshold(0.9)
///     .capacity(1_000)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Minimum cosine similarity for a hit (inclusive). Default: 0.85.
    pub similarity_threshold: f32,
    /// Maximum number of entries; 0 disables storage. Default: 10,000.
    pub capacity: usize,
    /// Time-to-live for entries. Default: 1 hour.
    pub ttl: Duration,
    /// Minimum time between lazy sweeps of expired entries. Default: 60s.
    pub sweep_interval: Duration,
    /// Upper bound on a single embedding call. Default: 5s.
    pub embed_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            capacity: 10_000,
            ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
            embed_timeout: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the similarity threshold.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the maximum number of entries.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the time-to-live for entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the minimum interval between lazy sweeps.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the embedding timeout.
    pub fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }
}

/// One cached query/response pair.
///
/// Only `hit_count` and `last_accessed_at` change after insertion.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    key: u64,
    embedding: Embedding,
    response: V,
    created_at: Instant,
    last_accessed_at: Instant,
    hit_count: u64,
    /// Logical insertion order, tie-breaker for equal `created_at`.
    seq: u64,
    /// Logical access order, tie-breaker for equal `last_accessed_at`.
    access_seq: u64,
}

impl<V> CacheEntry<V> {
    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn response(&self) -> &V {
        &self.response
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> Instant {
        self.last_accessed_at
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) > ttl
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<V> {
    pub response: V,
    /// Cosine similarity between the query and the stored embedding.
    pub similarity: f32,
    /// Key of the entry that matched.
    pub key: u64,
    /// Hit count of the entry, including this hit.
    pub hit_count: u64,
}

/// All live entries. Owned exclusively by the cache.
struct CacheIndex<V> {
    entries: HashMap<u64, CacheEntry<V>>,
    clock: u64,
    last_sweep: Instant,
}

impl<V> CacheIndex<V> {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Remove expired entries, returning how many were dropped.
    fn remove_expired(&mut self, now: Instant, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now, ttl));
        let removed = before - self.entries.len();
        if removed > 0 {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "expired")
                .increment(removed as u64);
        }
        removed
    }

    /// Remove the least-recently-used entry.
    fn evict_lru(&mut self) -> Option<u64> {
        let key = self
            .entries
            .values()
            .min_by_key(|e| (e.last_accessed_at, e.access_seq))
            .map(|e| e.key)?;
        self.entries.remove(&key);
        metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "lru").increment(1);
        Some(key)
    }
}

/// In-memory semantic cache.
///
/// `V` is the stored response payload; the pipeline uses `String`.
/// See module docs for locking, expiry and failure semantics.
pub struct SemanticCache<V = String> {
    config: CacheConfig,
    embedder: Arc<dyn Embedder>,
    index: Mutex<CacheIndex<V>>,
}

impl<V: Clone + Send + Sync + 'static> SemanticCache<V> {
    /// Create an empty cache using `embedder` for both lookups and inserts.
    pub fn new(config: CacheConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            config,
            embedder,
            index: Mutex::new(CacheIndex {
                entries: HashMap::new(),
                clock: 0,
                last_sweep: Instant::now(),
            }),
        }
    }

    /// The cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up the most similar live entry.
    ///
    /// Returns `None` on a miss or on any internal error. Emits cache
    /// hit/miss metrics.
    pub async fn lookup(&self, text: &str) -> Option<CacheHit<V>> {
        match self.try_lookup(text).await {
            Ok(Some(hit)) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(hit)
            }
            Ok(None) => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
            Err(e) => {
                warn!(error = %e, "semantic cache lookup failed, treating as miss");
                metrics::counter!(telemetry::CACHE_ERRORS_TOTAL).increment(1);
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Look up the most similar live entry, surfacing internal errors.
    ///
    /// Picks the highest similarity at or above the threshold; ties go to
    /// the most recently created entry. A hit bumps the entry's hit count
    /// and access time.
    ///
    /// Entries whose embedding dimension differs from the query's are
    /// skipped. If no live entry has a comparable dimension, the lookup
    /// fails with [`HuginnError::DimensionMismatch`].
    pub async fn try_lookup(&self, text: &str) -> Result<Option<CacheHit<V>>> {
        let embedding = self.embed(text).await?;
        let now = Instant::now();
        let ttl = self.config.ttl;

        let mut index = self.index.lock();
        if now.saturating_duration_since(index.last_sweep) >= self.config.sweep_interval {
            let removed = index.remove_expired(now, ttl);
            index.last_sweep = now;
            if removed > 0 {
                debug!(removed, "swept expired cache entries");
            }
        }

        let mut best: Option<(f32, Instant, u64, u64)> = None;
        let mut compared = 0usize;
        let mut mismatched: Option<HuginnError> = None;
        for entry in index.entries.values() {
            if entry.is_expired(now, ttl) {
                continue;
            }
            let similarity = match cosine_similarity(&embedding.values, &entry.embedding.values) {
                Ok(similarity) => similarity,
                Err(e) => {
                    mismatched.get_or_insert(e);
                    continue;
                }
            };
            compared += 1;
            if similarity < self.config.similarity_threshold {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_sim, best_created, best_seq, _)) => {
                    similarity > best_sim
                        || (similarity == best_sim
                            && (entry.created_at, entry.seq) > (best_created, best_seq))
                }
            };
            if better {
                best = Some((similarity, entry.created_at, entry.seq, entry.key));
            }
        }

        if let Some(e) = mismatched {
            if compared == 0 {
                return Err(e);
            }
            warn!(error = %e, "skipping cache entries with a different embedding dimension");
        }

        let Some((similarity, _, _, key)) = best else {
            return Ok(None);
        };

        let tick = index.tick();
        let Some(entry) = index.entries.get_mut(&key) else {
            return Ok(None);
        };
        entry.hit_count += 1;
        entry.last_accessed_at = now;
        entry.access_seq = tick;

        Ok(Some(CacheHit {
            response: entry.response.clone(),
            similarity,
            key,
            hit_count: entry.hit_count,
        }))
    }

    /// Embed `text` and store `response` under it.
    ///
    /// An entry with the identical text is overwritten rather than
    /// duplicated. Only the embedding step can fail; the index mutation
    /// itself always succeeds.
    pub async fn insert(&self, text: &str, response: V) -> Result<()> {
        let embedding = self.embed(text).await?;
        self.insert_embedding(text, embedding, response);
        Ok(())
    }

    /// Store `response` under a precomputed embedding of `text`.
    pub fn insert_embedding(&self, text: &str, embedding: Embedding, response: V) {
        if self.config.capacity == 0 {
            return;
        }

        let key = cache_key(text);
        let now = Instant::now();
        let mut index = self.index.lock();

        if !index.entries.contains_key(&key) && index.entries.len() >= self.config.capacity {
            index.remove_expired(now, self.config.ttl);
            while index.entries.len() >= self.config.capacity {
                match index.evict_lru() {
                    Some(evicted) => debug!(evicted, "evicted least-recently-used cache entry"),
                    None => break,
                }
            }
        }

        let tick = index.tick();
        index.entries.insert(
            key,
            CacheEntry {
                key,
                embedding,
                response,
                created_at: now,
                last_accessed_at: now,
                hit_count: 0,
                seq: tick,
                access_seq: tick,
            },
        );
    }

    /// Whether a live entry exists for exactly this text.
    pub fn contains(&self, text: &str) -> bool {
        let now = Instant::now();
        self.index
            .lock()
            .entries
            .get(&cache_key(text))
            .is_some_and(|e| !e.is_expired(now, self.config.ttl))
    }

    /// Copy of the entry stored for exactly this text, expired or not.
    pub fn entry(&self, text: &str) -> Option<CacheEntry<V>> {
        self.index.lock().entries.get(&cache_key(text)).cloned()
    }

    /// Remove all expired entries now, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut index = self.index.lock();
        index.last_sweep = now;
        index.remove_expired(now, self.config.ttl)
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.index.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.index.lock().entries.clear();
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        match tokio::time::timeout(self.config.embed_timeout, self.embedder.embed(text)).await {
            Ok(result) => result,
            Err(_) => Err(HuginnError::EmbeddingServiceUnavailable(format!(
                "{} did not respond within {:?}",
                self.embedder.name(),
                self.config.embed_timeout
            ))),
        }
    }
}

/// Stable key for the exact text of a query.
///
/// Uses `DefaultHasher` (SipHash), deterministic within a process lifetime,
/// which is sufficient for an in-memory index. Used for overwrite
/// bookkeeping only; retrieval goes through similarity.
pub fn cache_key(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
