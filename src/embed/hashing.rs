//! Feature-hashing embedder.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::Result;
use crate::traits::{Embedder, validate_embed_input};
use crate::types::Embedding;

/// Default vector length.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Default input limit, in characters.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 8_192;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic embedder hashing words and character trigrams into buckets.
///
/// Every feature adds a positive weight, so any non-empty text produces a
/// non-zero vector and identical texts always have similarity 1.0.
/// `DefaultHasher` is deterministic within a build, which is all an
/// in-memory cache needs.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    max_input_chars: usize,
    model: String,
}

impl HashingEmbedder {
    /// Create an embedder with [`DEFAULT_DIMENSIONS`].
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    /// Create an embedder with a custom vector length (minimum 1).
    pub fn with_dimensions(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            model: format!("huginn-hashing-v1-{dimensions}"),
        }
    }

    /// Set the maximum accepted input length in characters.
    pub fn max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    /// Vector length produced by this embedder.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Synchronous embedding; the async trait method delegates here.
    pub fn embed_text(&self, text: &str) -> Result<Embedding> {
        validate_embed_input(text, self.max_input_chars)?;

        let normalized = text.to_lowercase();
        let mut values = vec![0.0f32; self.dimensions];

        for word in normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            values[self.bucket(("w", word))] += WORD_WEIGHT;
        }

        let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
        let chars: Vec<char> = collapsed.chars().collect();
        if chars.len() < 3 {
            let whole: String = chars.iter().collect();
            values[self.bucket(("t", whole.as_str()))] += TRIGRAM_WEIGHT;
        } else {
            for window in chars.windows(3) {
                let gram: String = window.iter().collect();
                values[self.bucket(("t", gram.as_str()))] += TRIGRAM_WEIGHT;
            }
        }

        let norm = values
            .iter()
            .map(|v| f64::from(*v) * f64::from(*v))
            .sum::<f64>()
            .sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v = (f64::from(*v) / norm) as f32;
            }
        }

        Ok(Embedding::new(values, self.model.clone()))
    }

    fn bucket(&self, feature: (&str, &str)) -> usize {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        (hasher.finish() % self.dimensions as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_text(text)
    }
}
