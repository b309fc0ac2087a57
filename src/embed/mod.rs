//! Bundled embedders.
//!
//! - [`HashingEmbedder`]: local feature-hashing embedder, the default.
//!   Needs no model download or network access, which keeps the pipeline
//!   usable offline and makes cache behaviour reproducible in tests.
//!
//! Remote embeddings are served by
//! [`OpenAiCompatClient`](crate::providers::OpenAiCompatClient).
//!
//! # Similarity geometry
//!
//! The cache's similarity threshold (default 0.85) only means something
//! relative to one embedder. For [`HashingEmbedder`], 0.85 admits paraphrases
//! that share most words and trigrams (word order, punctuation and case
//! changes), and rejects questions that differ in their key terms.
//! Swapping embedders should come with a re-tuned threshold.

mod hashing;

pub use hashing::{DEFAULT_DIMENSIONS, DEFAULT_MAX_INPUT_CHARS, HashingEmbedder};
