//! Memoising embedder decorator.
//!
//! [`CachingEmbedder`] wraps any [`Embedder`] with a bounded moka cache keyed
//! on a content hash of (model, text). Embedding is deterministic (same input
//! → same output), so a memoised vector is always the vector the inner
//! embedder would return.
//!
//! The pipeline embeds each query once for the cache lookup and again for the
//! insert after a miss; with the memo in front, the second call is free.
//! Errors are never memoised, so a transient embedder outage does not poison
//! later requests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;

use crate::Result;
use crate::traits::Embedder;
use crate::types::Embedding;

/// Default number of memoised embeddings.
pub const DEFAULT_MEMO_ENTRIES: u64 = 4_096;

/// Embedder decorator that remembers recent embeddings.
pub struct CachingEmbedder {
    inner: Arc<dyn Embedder>,
    memo: Cache<u64, Embedding>,
}

impl CachingEmbedder {
    /// Wrap `inner` with a memo of [`DEFAULT_MEMO_ENTRIES`].
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        Self::with_max_entries(inner, DEFAULT_MEMO_ENTRIES)
    }

    /// Wrap `inner` with a memo of a custom size.
    pub fn with_max_entries(inner: Arc<dyn Embedder>, max: u64) -> Self {
        Self {
            inner,
            memo: Cache::new(max),
        }
    }

    /// Number of memoised embeddings (approximate, per moka).
    pub fn len(&self) -> u64 {
        self.memo.entry_count()
    }

    /// Whether the memo is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(&self, text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.inner.model().hash(&mut hasher);
        text.hash(&mut hasher);
        hasher.finish()
    }
}

#[async_trait]
impl Embedder for CachingEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let key = self.key(text);
        if let Some(embedding) = self.memo.get(&key).await {
            return Ok(embedding);
        }
        let embedding = self.inner.embed(text).await?;
        self.memo.insert(key, embedding.clone()).await;
        Ok(embedding)
    }
}
