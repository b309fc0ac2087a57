//! Caching subsystem.
//!
//! Two independent caches:
//!
//! - [`SemanticCache`]: similarity-keyed response cache consulted by the
//!   pipeline before classification. LRU + TTL, fail-open. See [`semantic`]
//!   module docs for locking and eviction.
//!
//! - [`CachingEmbedder`]: moka-backed memo of embeddings in front of any
//!   [`Embedder`](crate::Embedder), so one query is embedded once per
//!   lookup/insert pair.

pub mod embedding;
pub mod semantic;
mod similarity;

pub use embedding::{CachingEmbedder, DEFAULT_MEMO_ENTRIES};
pub use semantic::{CacheConfig, CacheEntry, CacheHit, SemanticCache, cache_key};
pub use similarity::cosine_similarity;
