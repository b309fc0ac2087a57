//! Tests for the semantic cache: similarity threshold, LRU, TTL, fail-open.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use huginn::cache::{CacheConfig, SemanticCache};
use huginn::types::Embedding;
use huginn::{Embedder, HashingEmbedder, HuginnError, Result};

// ============================================================================
// Mock embedders
// ============================================================================

/// Returns fixed vectors for known texts.
struct StubEmbedder {
    vectors: HashMap<&'static str, Vec<f32>>,
}

impl StubEmbedder {
    fn new(pairs: &[(&'static str, &[f32])]) -> Arc<Self> {
        Arc::new(Self {
            vectors: pairs.iter().map(|(k, v)| (*k, v.to_vec())).collect(),
        })
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-v1"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.vectors
            .get(text)
            .map(|v| Embedding::new(v.clone(), "stub-v1"))
            .ok_or_else(|| HuginnError::InvalidInput(format!("no stub vector for {text:?}")))
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing-v1"
    }

    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Err(HuginnError::EmbeddingServiceUnavailable(
            "connection refused".to_string(),
        ))
    }
}

struct SlowEmbedder;

#[async_trait]
impl Embedder for SlowEmbedder {
    fn name(&self) -> &str {
        "slow"
    }

    fn model(&self) -> &str {
        "slow-v1"
    }

    async fn embed(&self, _text: &str) -> Result<Embedding> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Embedding::new(vec![1.0], "slow-v1"))
    }
}

fn hashing_cache(config: CacheConfig) -> SemanticCache {
    SemanticCache::new(config, Arc::new(HashingEmbedder::new()))
}

// ============================================================================
// Similarity
// ============================================================================

#[tokio::test]
async fn identical_text_hits_with_similarity_one() {
    let cache = hashing_cache(CacheConfig::default());
    cache.insert("What is 2+2?", "4".to_string()).await.unwrap();

    let hit = cache.lookup("What is 2+2?").await.expect("expected a hit");
    assert_eq!(hit.response, "4");
    assert!((hit.similarity - 1.0).abs() < 1e-6);
    assert_eq!(hit.hit_count, 1);
}

#[tokio::test]
async fn unrelated_text_misses() {
    let cache = hashing_cache(CacheConfig::default());
    cache.insert("What is 2+2?", "4".to_string()).await.unwrap();

    assert!(cache.lookup("How do I reset my password").await.is_none());
}

#[tokio::test]
async fn similarity_exactly_at_threshold_hits() {
    // cos([1,0,0,0,0], [17,10,3,1,1]) = 17 / 20 = 0.85
    let embedder = StubEmbedder::new(&[
        ("stored", &[1.0, 0.0, 0.0, 0.0, 0.0]),
        ("incoming", &[17.0, 10.0, 3.0, 1.0, 1.0]),
    ]);
    let cache = SemanticCache::new(CacheConfig::default(), embedder);
    cache.insert("stored", "answer".to_string()).await.unwrap();

    let hit = cache.lookup("incoming").await.expect("threshold is inclusive");
    assert_eq!(hit.similarity, 0.85);
    assert_eq!(hit.response, "answer");
}

#[tokio::test]
async fn similarity_just_below_threshold_misses() {
    // cos ≈ 0.8499
    let embedder = StubEmbedder::new(&[
        ("stored", &[1.0, 0.0, 0.0, 0.0, 0.0]),
        ("incoming", &[16.99, 10.0, 3.0, 1.0, 1.0]),
    ]);
    let cache = SemanticCache::new(CacheConfig::default(), embedder);
    cache.insert("stored", "answer".to_string()).await.unwrap();

    assert!(cache.lookup("incoming").await.is_none());
}

#[tokio::test]
async fn best_match_wins() {
    let embedder = StubEmbedder::new(&[
        ("close", &[1.0, 0.1]),
        ("closer", &[1.0, 0.01]),
        ("incoming", &[1.0, 0.0]),
    ]);
    let cache = SemanticCache::new(CacheConfig::default(), embedder);
    cache.insert("close", "a".to_string()).await.unwrap();
    cache.insert("closer", "b".to_string()).await.unwrap();

    assert_eq!(cache.lookup("incoming").await.unwrap().response, "b");
}

#[tokio::test]
async fn equal_similarity_prefers_newest_entry() {
    let embedder = StubEmbedder::new(&[
        ("first", &[1.0, 0.0]),
        ("second", &[1.0, 0.0]),
        ("incoming", &[1.0, 0.0]),
    ]);
    let cache = SemanticCache::new(CacheConfig::default(), embedder);
    cache.insert("first", "old".to_string()).await.unwrap();
    cache.insert("second", "new".to_string()).await.unwrap();

    assert_eq!(cache.lookup("incoming").await.unwrap().response, "new");
}

// ============================================================================
// Insert semantics
// ============================================================================

#[tokio::test]
async fn identical_text_overwrites() {
    let cache = hashing_cache(CacheConfig::default());
    cache.insert("q", "a".to_string()).await.unwrap();
    cache.insert("q", "b".to_string()).await.unwrap();

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.lookup("q").await.unwrap().response, "b");
}

#[tokio::test]
async fn zero_capacity_stores_nothing() {
    let cache = hashing_cache(CacheConfig::new().capacity(0));
    cache.insert("q", "a".to_string()).await.unwrap();

    assert!(cache.is_empty());
    assert!(cache.lookup("q").await.is_none());
}

#[tokio::test]
async fn lru_evicts_least_recently_used() {
    let embedder = StubEmbedder::new(&[
        ("A", &[1.0, 0.0, 0.0]),
        ("B", &[0.0, 1.0, 0.0]),
        ("C", &[0.0, 0.0, 1.0]),
    ]);
    let cache = SemanticCache::new(CacheConfig::new().capacity(2), embedder);

    cache.insert("A", "a".to_string()).await.unwrap();
    cache.insert("B", "b".to_string()).await.unwrap();
    assert!(cache.lookup("A").await.is_some());
    cache.insert("C", "c".to_string()).await.unwrap();

    assert_eq!(cache.len(), 2);
    assert!(cache.contains("A"));
    assert!(!cache.contains("B"));
    assert!(cache.contains("C"));
}

#[tokio::test]
async fn concurrent_inserts_respect_capacity() {
    let cache = Arc::new(hashing_cache(CacheConfig::new().capacity(10)));

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .insert(&format!("distinct query {i}"), i.to_string())
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(cache.len(), 10);
}

#[tokio::test]
async fn entry_exposes_metadata() {
    let cache = hashing_cache(CacheConfig::default());
    cache.insert("hello world", "hi".to_string()).await.unwrap();
    cache.lookup("hello world").await.unwrap();
    cache.lookup("hello world").await.unwrap();

    let entry = cache.entry("hello world").unwrap();
    assert_eq!(entry.hit_count(), 2);
    assert_eq!(entry.response(), "hi");
    assert_eq!(entry.embedding().dimensions, 384);
    assert!(entry.last_accessed_at() >= entry.created_at());
}

// ============================================================================
// Expiry
// ============================================================================

#[tokio::test(start_paused = true)]
async fn entry_expires_after_ttl() {
    let cache = hashing_cache(CacheConfig::new().ttl(Duration::from_secs(60)));
    cache.insert("q", "a".to_string()).await.unwrap();

    tokio::time::advance(Duration::from_secs(60)).await;
    assert!(cache.lookup("q").await.is_some(), "age == ttl is still live");

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(cache.lookup("q").await.is_none());
    assert!(!cache.contains("q"));
}

#[tokio::test(start_paused = true)]
async fn lazy_sweep_removes_expired_entries() {
    let config = CacheConfig::new()
        .ttl(Duration::from_secs(10))
        .sweep_interval(Duration::from_secs(30));
    let cache = hashing_cache(config);
    cache.insert("old", "a".to_string()).await.unwrap();

    tokio::time::advance(Duration::from_secs(20)).await;
    cache.lookup("anything").await;
    assert_eq!(cache.len(), 1, "sweep interval not yet elapsed");

    tokio::time::advance(Duration::from_secs(11)).await;
    cache.lookup("anything").await;
    assert_eq!(cache.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn purge_expired_counts_removed() {
    let cache = hashing_cache(CacheConfig::new().ttl(Duration::from_secs(5)));
    cache.insert("one", "1".to_string()).await.unwrap();
    cache.insert("two", "2".to_string()).await.unwrap();
    tokio::time::advance(Duration::from_secs(3)).await;
    cache.insert("three", "3".to_string()).await.unwrap();
    tokio::time::advance(Duration::from_secs(3)).await;

    assert_eq!(cache.purge_expired(), 2);
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn full_cache_drops_expired_before_lru() {
    let embedder = StubEmbedder::new(&[
        ("A", &[1.0, 0.0, 0.0]),
        ("B", &[0.0, 1.0, 0.0]),
        ("C", &[0.0, 0.0, 1.0]),
    ]);
    let config = CacheConfig::new()
        .capacity(2)
        .ttl(Duration::from_secs(10));
    let cache = SemanticCache::new(config, embedder);

    cache.insert("A", "a".to_string()).await.unwrap();
    tokio::time::advance(Duration::from_secs(1)).await;
    cache.insert("B", "b".to_string()).await.unwrap();
    tokio::time::advance(Duration::from_secs(1)).await;
    // A becomes the most recently used entry.
    assert!(cache.lookup("A").await.is_some());
    tokio::time::advance(Duration::from_secs(9)).await;

    // A has expired, B (age == ttl) is live: plain LRU would evict B.
    cache.insert("C", "c".to_string()).await.unwrap();

    assert!(cache.contains("B"));
    assert!(cache.contains("C"));
    assert_eq!(cache.len(), 2);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn embedder_failure_is_a_miss() {
    let cache: SemanticCache = SemanticCache::new(CacheConfig::default(), Arc::new(FailingEmbedder));

    assert!(cache.lookup("anything").await.is_none());
    assert!(matches!(
        cache.try_lookup("anything").await,
        Err(HuginnError::EmbeddingServiceUnavailable(_))
    ));
    assert!(matches!(
        cache.insert("anything", "x".to_string()).await,
        Err(HuginnError::EmbeddingServiceUnavailable(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn embedding_timeout_is_a_miss() {
    let config = CacheConfig::new().embed_timeout(Duration::from_secs(1));
    let cache: SemanticCache = SemanticCache::new(config, Arc::new(SlowEmbedder));

    assert!(cache.lookup("anything").await.is_none());
    let err = cache.try_lookup("anything").await.unwrap_err();
    assert!(matches!(err, HuginnError::EmbeddingServiceUnavailable(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn dimension_mismatch_is_a_miss() {
    let embedder = StubEmbedder::new(&[("stored", &[1.0, 0.0, 0.0]), ("incoming", &[1.0, 0.0])]);
    let cache = SemanticCache::new(CacheConfig::default(), embedder);
    cache.insert("stored", "x".to_string()).await.unwrap();

    assert!(cache.lookup("incoming").await.is_none());
    assert!(matches!(
        cache.try_lookup("incoming").await,
        Err(HuginnError::DimensionMismatch { .. })
    ));
}

#[tokio::test]
async fn entry_of_another_dimension_does_not_hide_matches() {
    let embedder = StubEmbedder::new(&[
        ("good", &[1.0, 0.0]),
        ("odd", &[1.0, 0.0, 0.0]),
        ("query", &[1.0, 0.0]),
    ]);
    let cache = SemanticCache::new(CacheConfig::default(), embedder);
    cache.insert("good", "G".to_string()).await.unwrap();
    cache.insert("odd", "O".to_string()).await.unwrap();

    for _ in 0..3 {
        let hit = cache.lookup("query").await.expect("good entry should still match");
        assert_eq!(hit.response, "G");
    }
    let hit = cache.try_lookup("query").await.unwrap().unwrap();
    assert_eq!(hit.response, "G");
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn clear_empties_cache() {
    let cache = hashing_cache(CacheConfig::default());
    cache.insert("a", "1".to_string()).await.unwrap();
    cache.insert("b", "2".to_string()).await.unwrap();
    cache.clear();
    assert!(cache.is_empty());
}
