//! Collaborator traits: embedding and generation.
//!
//! The pipeline depends on two external capabilities, each behind its own
//! narrow trait rather than one "god trait". This enables:
//! - Decorators: [`CachingEmbedder`](crate::cache::CachingEmbedder) wraps any embedder
//! - Test doubles: deterministic stubs in place of remote services
//! - One client serving both roles ([`OpenAiCompatClient`](crate::providers::OpenAiCompatClient))
//!
//! # Failure semantics
//!
//! - Embedders return `EmbeddingServiceUnavailable` when the model cannot be
//!   reached. The semantic cache treats every embedder error as a miss.
//! - Backends return any error; the pipeline surfaces it as a retryable
//!   `GenerationFailed` and never inserts into the cache.

use async_trait::async_trait;

use crate::Result;
use crate::types::{Embedding, GenerateOptions, GenerateResponse, Message};

/// Converts text to a fixed-length vector.
///
/// Implementations must be deterministic for the same text and model version,
/// and must reject empty or over-long input (`InvalidInput`, `InputTooLong`).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embedder name for logging/debugging.
    fn name(&self) -> &str;

    /// Model identifier; embeddings from different models are not comparable.
    fn model(&self) -> &str;

    /// Generate the embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// The external LLM call. A black box to the pipeline.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name for logging/debugging.
    fn name(&self) -> &str;

    /// Generate a response for the rendered prompt messages.
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<GenerateResponse>;
}

/// Validate embedder input against a character limit.
///
/// Shared by the bundled embedders so the error contract is identical.
pub fn validate_embed_input(text: &str, max_chars: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(crate::HuginnError::InvalidInput(
            "cannot embed empty text".to_string(),
        ));
    }
    let len = text.chars().count();
    if len > max_chars {
        return Err(crate::HuginnError::InputTooLong {
            len,
            max: max_chars,
        });
    }
    Ok(())
}
