//! Embedding vectors

use serde::{Deserialize, Serialize};

/// Fixed-length vector representation of a text.
///
/// Produced once per text by an [`Embedder`](crate::Embedder). The semantic
/// cache never mutates an embedding after it has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
}

impl Embedding {
    /// Create an embedding, deriving `dimensions` from the vector length.
    pub fn new(values: Vec<f32>, model: impl Into<String>) -> Self {
        Self {
            dimensions: values.len(),
            values,
            model: model.into(),
        }
    }

    /// Euclidean norm of the vector.
    pub fn norm(&self) -> f32 {
        self.values
            .iter()
            .map(|v| f64::from(*v) * f64::from(*v))
            .sum::<f64>()
            .sqrt() as f32
    }
}
